//! Full-stack transactions against a scripted bus-line model.
//!
//! The model stands in for the eUSCI hardware: the port records every
//! line-level operation, and the [`Sleep`] implementation plays the part of
//! the interrupt controller, delivering one enabled interrupt per suspend.
//! The scenarios mirror the MAX17260 fuel-gauge and memory-LCD traffic this
//! engine was built for.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use eusci_master::master::{Master, SharedBus};
use eusci_master::port::{Direction, Event, InterruptBits, MasterPort};
use eusci_master::transfer::{BusError, Transfer};
use eusci_master::wake::Sleep;

const GAUGE: u8 = 0x36;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Target(u8),
    Dir(Direction),
    Start,
    Stop,
    Byte(u8),
}

/// Everything visible on the bus line, plus the scripted device behavior.
struct Line {
    ops: Vec<Op>,
    listen: InterruptBits,
    reply: VecDeque<u8>,
    absent: bool,
}

impl Line {
    fn new() -> Self {
        Line {
            ops: Vec::new(),
            listen: InterruptBits::empty(),
            reply: VecDeque::new(),
            absent: false,
        }
    }
}

struct ModelPort(Rc<RefCell<Line>>);

impl MasterPort for ModelPort {
    fn set_target(&mut self, address: u8) {
        self.0.borrow_mut().ops.push(Op::Target(address));
    }
    fn set_direction(&mut self, direction: Direction) {
        self.0.borrow_mut().ops.push(Op::Dir(direction));
    }
    fn transmit_start(&mut self) {
        self.0.borrow_mut().ops.push(Op::Start);
    }
    fn transmit_stop(&mut self) {
        self.0.borrow_mut().ops.push(Op::Stop);
    }
    fn transmit_byte(&mut self, byte: u8) {
        self.0.borrow_mut().ops.push(Op::Byte(byte));
    }
    fn listen(&mut self, interrupts: InterruptBits) {
        self.0.borrow_mut().listen = interrupts;
    }
}

/// Interrupt-controller stand-in: each suspend delivers the next enabled
/// interrupt to the shared bus cell, exactly as a woken ISR would.
struct IrqPump<'a> {
    line: Rc<RefCell<Line>>,
    bus: &'a SharedBus<ModelPort, 32>,
}

impl Sleep for IrqPump<'_> {
    fn sleep(&mut self) {
        let event = {
            let mut line = self.line.borrow_mut();
            if line.absent && line.listen.contains(InterruptBits::NACK) {
                Some(Event::Nack)
            } else if line.listen.contains(InterruptBits::TX_READY) {
                Some(Event::TxReady)
            } else if line.listen.contains(InterruptBits::RX_READY) {
                let byte = line.reply.pop_front().unwrap_or(0xFF);
                Some(Event::RxReady(byte))
            } else {
                None
            }
        };
        if let Some(event) = event {
            self.bus.on_interrupt(event);
        }
    }
}

fn harness() -> (Rc<RefCell<Line>>, SharedBus<ModelPort, 32>) {
    let line = Rc::new(RefCell::new(Line::new()));
    let bus = SharedBus::new();
    bus.install(Transfer::new(ModelPort(line.clone())));
    (line, bus)
}

fn master<'a>(
    line: &Rc<RefCell<Line>>,
    bus: &'a SharedBus<ModelPort, 32>,
) -> Master<'a, ModelPort, IrqPump<'a>, 32> {
    Master::new(
        bus,
        IrqPump {
            line: line.clone(),
            bus,
        },
    )
}

#[test]
fn gauge_soft_wakeup_write() {
    let (line, bus) = harness();
    let mut master = master(&line, &bus);

    master.write_register(GAUGE, 0x60, &[0x90, 0x00]).unwrap();
    assert!(!master.is_busy());

    assert_eq!(
        line.borrow().ops,
        [
            Op::Target(GAUGE),
            Op::Dir(Direction::Transmit),
            Op::Start,
            Op::Byte(0x60),
            Op::Byte(0x90),
            Op::Byte(0x00),
            Op::Stop,
        ]
    );
    assert_eq!(line.borrow().listen, InterruptBits::empty());
}

#[test]
fn gauge_capacity_read() {
    let (line, bus) = harness();
    line.borrow_mut().reply.extend([0xB0, 0x04]);
    let mut master = master(&line, &bus);

    let mut cap = [0u8; 2];
    master.read_register(GAUGE, 0x05, &mut cap).unwrap();
    assert_eq!(cap, [0xB0, 0x04]);

    assert_eq!(
        line.borrow().ops,
        [
            Op::Target(GAUGE),
            Op::Dir(Direction::Transmit),
            Op::Start,
            Op::Byte(0x05),
            Op::Dir(Direction::Receive),
            Op::Start,
            Op::Stop,
        ]
    );
}

#[test]
fn absent_device_nacks_then_recovers() {
    let (line, bus) = harness();
    line.borrow_mut().absent = true;
    let mut master = master(&line, &bus);

    assert_eq!(
        master.write_register(GAUGE, 0x60, &[0x90, 0x00]),
        Err(BusError::Nack)
    );
    assert!(!master.is_busy());
    // Aborted before any payload byte; the bus was released with a stop.
    assert_eq!(
        line.borrow().ops,
        [
            Op::Target(GAUGE),
            Op::Dir(Direction::Transmit),
            Op::Start,
            Op::Stop,
        ]
    );

    line.borrow_mut().absent = false;
    line.borrow_mut().ops.clear();
    master.write_register(GAUGE, 0x60, &[0x90, 0x00]).unwrap();
    assert_eq!(*line.borrow().ops.last().unwrap(), Op::Stop);
}

#[test]
fn gauge_bring_up_sequence() {
    let (line, bus) = harness();
    // Replies: original HibCFG, then the DesignCap read-back.
    line.borrow_mut().reply.extend([0x87, 0x0C, 0xB0, 0x04]);
    let mut master = master(&line, &bus);

    let mut hib_cfg = [0u8; 2];
    master.read_register(GAUGE, 0xDB, &mut hib_cfg).unwrap();
    assert_eq!(hib_cfg, [0x87, 0x0C]);

    // Hibernate exit handshake.
    master.write_register(GAUGE, 0x60, &[0x90, 0x00]).unwrap();
    master.write_register(GAUGE, 0xBA, &[0x00, 0x00]).unwrap();
    master.write_register(GAUGE, 0x60, &[0x00, 0x00]).unwrap();

    // Design capacity, then verify the write landed.
    master.write_register(GAUGE, 0x18, &[0xB0, 0x04]).unwrap();
    let mut check = [0u8; 2];
    master.read_register(GAUGE, 0x18, &mut check).unwrap();
    assert_eq!(check, [0xB0, 0x04]);

    // Restore the saved hibernate configuration.
    master.write_register(GAUGE, 0xBA, &hib_cfg).unwrap();

    // Seven transactions, each opening with a start on the gauge address.
    let line = line.borrow();
    let starts = line.ops.iter().filter(|op| **op == Op::Target(GAUGE)).count();
    assert_eq!(starts, 7);
    assert_eq!(line.reply.len(), 0);
}

#[test]
fn display_line_raw_write() {
    let (line, bus) = harness();
    let mut master = master(&line, &bus);

    // One memory-LCD line: reversed row address, 16 pixel bytes, trailer.
    let mut frame = [0u8; 18];
    frame[0] = 0x80;
    frame[17] = 0x00;
    master.write_raw(0x00, &frame).unwrap();

    let line = line.borrow();
    // No register byte: the first thing on the line after the start is the
    // row address.
    assert_eq!(line.ops[..4], [
        Op::Target(0x00),
        Op::Dir(Direction::Transmit),
        Op::Start,
        Op::Byte(0x80),
    ]);
    let bytes = line.ops.iter().filter(|op| matches!(op, Op::Byte(_))).count();
    assert_eq!(bytes, 18);
    assert_eq!(*line.ops.last().unwrap(), Op::Stop);
}

#[test]
fn oversized_request_rejected_without_bus_activity() {
    let (line, bus) = harness();
    let mut master = master(&line, &bus);

    let too_big = [0u8; 33];
    assert_eq!(
        master.write_register(GAUGE, 0x60, &too_big),
        Err(BusError::Overrun)
    );
    let mut buf = [0u8; 33];
    assert_eq!(
        master.read_register(GAUGE, 0x05, &mut buf),
        Err(BusError::Overrun)
    );
    assert!(line.borrow().ops.is_empty());
}

#[test]
fn uninstalled_bus_reports_uninitialized() {
    let line = Rc::new(RefCell::new(Line::new()));
    let bus: SharedBus<ModelPort, 32> = SharedBus::new();
    let mut master = master(&line, &bus);

    assert_eq!(
        master.write_register(GAUGE, 0x60, &[0x90]),
        Err(BusError::Uninitialized)
    );
}

#[test]
fn nonblocking_arm_and_poll() {
    let (line, bus) = harness();
    line.borrow_mut().reply.extend([0x12, 0x34]);

    bus.start_read(GAUGE, 0x09, 2).unwrap();
    assert!(bus.is_busy());
    assert_eq!(bus.poll(), Err(nb::Error::WouldBlock));

    let mut pump = IrqPump {
        line: line.clone(),
        bus: &bus,
    };
    while bus.poll() == Err(nb::Error::WouldBlock) {
        pump.sleep();
    }
    assert!(!bus.is_busy());

    let mut vcell = [0u8; 2];
    assert_eq!(bus.copy_received(&mut vcell), 2);
    assert_eq!(vcell, [0x12, 0x34]);
}
