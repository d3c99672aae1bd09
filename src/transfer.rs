//! The byte-stream transaction engine.
//!
//! [`Transfer`] owns one [`MasterPort`] plus a pair of fixed-capacity staging
//! buffers and runs the register-transaction state machine:
//!
//! `Idle -> Address -> {Transmit | SwitchToReceive -> Receive} -> Idle`
//!
//! The foreground arms a transaction with [`start_write`](Transfer::start_write),
//! [`start_write_raw`](Transfer::start_write_raw) or
//! [`start_read`](Transfer::start_read); after that, every state change is
//! made by [`on_event`](Transfer::on_event) as the interrupt handler hands
//! bytes over one at a time. `on_event` returns the final status exactly once
//! per transaction, which the caller (normally
//! [`SharedBus::on_interrupt`](crate::master::SharedBus::on_interrupt)) uses
//! to wake the suspended foreground.
//!
//! A nack or arbitration loss aborts the transaction immediately with an
//! error status; nothing is retried here. There is no timeout: on a bus where
//! no interrupt ever fires the transaction stays armed forever, so callers
//! needing bounded latency must pair the engine with an external watchdog.

use crate::port::{Direction, Event, InterruptBits, MasterPort};

/// Transaction outcome, delivered once per armed transaction.
pub type Status = Result<(), BusError>;

/// Transfer errors, reported to the arming caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusError {
    /// The target never acknowledged a byte.
    Nack,
    /// Lost arbitration to another master.
    ArbitrationLost,
    /// A transaction is already in flight on this unit.
    Busy,
    /// The request does not fit the staging buffer.
    Overrun,
    /// No engine has been installed in the shared cell.
    Uninitialized,
}

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            BusError::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            BusError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            _ => ErrorKind::Other,
        }
    }
}

/// Engine phase. One of these describes the unit at any instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// No transaction armed.
    Idle,
    /// Start issued; the next transmit slot takes the register byte.
    Address,
    /// Register byte out on a read; reverse the line on the next slot.
    SwitchToReceive,
    /// Draining the staging buffer onto the line.
    Transmit,
    /// Clocking bytes into the receive buffer.
    Receive,
}

/// Interrupt-driven master transaction engine over one bus unit.
///
/// `CAP` bounds the payload of a single transaction; oversized requests are
/// rejected with [`BusError::Overrun`] before the bus is touched. The
/// caller's buffer is copied into the staging buffer at arm time, so it may
/// be reused immediately.
pub struct Transfer<P: MasterPort, const CAP: usize> {
    port: P,
    phase: Phase,
    direction: Direction,
    register: u8,
    tx_buf: [u8; CAP],
    tx_len: usize,
    tx_idx: usize,
    rx_buf: [u8; CAP],
    rx_remaining: usize,
    rx_idx: usize,
}

const ERROR_SOURCES: InterruptBits = InterruptBits::NACK.union(InterruptBits::ARBITRATION_LOST);

impl<P: MasterPort, const CAP: usize> Transfer<P, CAP> {
    /// Wrap a configured bus unit. The unit must already be set up for
    /// master operation (clocking, addressing mode, pins).
    pub fn new(port: P) -> Self {
        Transfer {
            port,
            phase: Phase::Idle,
            direction: Direction::Transmit,
            register: 0,
            tx_buf: [0; CAP],
            tx_len: 0,
            tx_idx: 0,
            rx_buf: [0; CAP],
            rx_remaining: 0,
            rx_idx: 0,
        }
    }

    /// Release the underlying port.
    pub fn free(self) -> P {
        self.port
    }

    /// Whether a transaction is currently armed.
    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Bytes received by the last completed read, oldest first.
    ///
    /// Only meaningful after `on_event` has reported a successful read; the
    /// slice is reset on the next arm.
    pub fn received(&self) -> &[u8] {
        &self.rx_buf[..self.rx_idx]
    }

    /// Arm a register write: register byte, then `data`, then stop.
    ///
    /// `data` may be empty, in which case only the register byte goes out.
    pub fn start_write(&mut self, target: u8, register: u8, data: &[u8]) -> Status {
        self.check_ready(data.len())?;
        self.stage(data);
        self.register = register;
        self.arm(target, Direction::Transmit, Phase::Address, 0);
        Ok(())
    }

    /// Arm a raw write: `data` with no register byte, then stop.
    ///
    /// This is the framing used by write-only peripherals such as memory
    /// LCDs, and matches plain `I2c::write` framing on an I2C unit.
    pub fn start_write_raw(&mut self, target: u8, data: &[u8]) -> Status {
        self.check_ready(data.len())?;
        self.stage(data);
        self.arm(target, Direction::Transmit, Phase::Transmit, 0);
        Ok(())
    }

    /// Arm a register read: register byte, repeated start, then clock in
    /// `len` bytes.
    ///
    /// A zero-length read degenerates to the register byte followed by a
    /// stop, the same frame as a zero-length write.
    pub fn start_read(&mut self, target: u8, register: u8, len: usize) -> Status {
        self.check_ready(len)?;
        self.tx_len = 0;
        self.register = register;
        let direction = if len == 0 { Direction::Transmit } else { Direction::Receive };
        self.arm(target, direction, Phase::Address, len);
        Ok(())
    }

    fn check_ready(&self, len: usize) -> Status {
        if self.is_busy() {
            return Err(BusError::Busy);
        }
        if len > CAP {
            return Err(BusError::Overrun);
        }
        Ok(())
    }

    fn stage(&mut self, data: &[u8]) {
        self.tx_buf[..data.len()].copy_from_slice(data);
        self.tx_len = data.len();
    }

    fn arm(&mut self, target: u8, direction: Direction, phase: Phase, rx_len: usize) {
        self.phase = phase;
        self.direction = direction;
        self.tx_idx = 0;
        self.rx_remaining = rx_len;
        self.rx_idx = 0;

        // Every transaction opens as a transmitter; reads reverse the line
        // after the register byte has been acknowledged.
        self.port.set_target(target);
        self.port.set_direction(Direction::Transmit);
        self.port.listen(InterruptBits::TX_READY | ERROR_SOURCES);
        self.port.transmit_start();
    }

    /// Advance the state machine on one hardware event.
    ///
    /// Called from interrupt context. Returns `Some(status)` exactly once per
    /// transaction, after the final byte has been placed in the receive
    /// buffer (reads) or handed to the shift register with the stop latched
    /// (writes). Events that do not match the current phase are ignored, as
    /// the hardware can leave stale flags behind.
    pub fn on_event(&mut self, event: Event) -> Option<Status> {
        match event {
            Event::TxReady => self.on_tx_ready(),
            Event::RxReady(byte) => self.on_rx_ready(byte),
            Event::Nack => self.on_error(BusError::Nack),
            Event::ArbitrationLost => self.on_error(BusError::ArbitrationLost),
        }
    }

    fn on_tx_ready(&mut self) -> Option<Status> {
        match self.phase {
            Phase::Address => {
                self.port.transmit_byte(self.register);
                self.phase = if self.direction == Direction::Receive {
                    Phase::SwitchToReceive
                } else {
                    Phase::Transmit
                };
                None
            }
            Phase::SwitchToReceive => {
                self.port.listen(InterruptBits::RX_READY | ERROR_SOURCES);
                self.port.set_direction(Direction::Receive);
                self.phase = Phase::Receive;
                self.port.transmit_start();
                if self.rx_remaining == 1 {
                    // Single-byte read: the stop must be latched before the
                    // byte is clocked in, or the unit keeps clocking.
                    self.port.transmit_stop();
                }
                None
            }
            Phase::Transmit => {
                if self.tx_idx < self.tx_len {
                    let byte = self.tx_buf[self.tx_idx];
                    self.tx_idx += 1;
                    self.port.transmit_byte(byte);
                    None
                } else {
                    self.port.transmit_stop();
                    self.complete()
                }
            }
            Phase::Idle | Phase::Receive => None,
        }
    }

    fn on_rx_ready(&mut self, byte: u8) -> Option<Status> {
        if self.phase != Phase::Receive {
            return None;
        }
        if self.rx_remaining > 0 {
            self.rx_buf[self.rx_idx] = byte;
            self.rx_idx += 1;
            self.rx_remaining -= 1;
        }
        if self.rx_remaining == 1 {
            // Stop goes out one byte early; see SwitchToReceive.
            self.port.transmit_stop();
            None
        } else if self.rx_remaining == 0 {
            self.complete()
        } else {
            None
        }
    }

    fn on_error(&mut self, error: BusError) -> Option<Status> {
        if self.phase == Phase::Idle {
            return None;
        }
        if error == BusError::Nack {
            // We still own the bus after a nack; release it cleanly. After an
            // arbitration loss the winner owns the line and a stop would
            // corrupt their transaction.
            self.port.transmit_stop();
        }
        self.port.listen(InterruptBits::empty());
        self.phase = Phase::Idle;
        Some(Err(error))
    }

    fn complete(&mut self) -> Option<Status> {
        self.port.listen(InterruptBits::empty());
        self.phase = Phase::Idle;
        Some(Ok(()))
    }
}
