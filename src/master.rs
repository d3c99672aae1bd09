//! Shared bus cell and the blocking master front-end.
//!
//! One [`SharedBus`] exists per physical bus unit. It holds the
//! [`Transfer`] engine behind a critical-section mutex so the interrupt
//! handler and the foreground can both reach it, plus the [`Completion`]
//! slot that carries each outcome back to the foreground. Wire the interrupt
//! handler to decode the hardware vector into an [`Event`] and call
//! [`SharedBus::on_interrupt`].
//!
//! [`Master`] is the foreground handle. Its register operations arm a
//! transaction, park on [`Sleep`] until the ISR publishes the outcome, and
//! return it synchronously, so a `Master` call site reads like a plain
//! blocking transfer while all byte handling happens at interrupt time.
//! Exactly one transaction can be in flight; a second arm while busy is
//! rejected with [`BusError::Busy`].
//!
//! For callers that cannot block, [`SharedBus::start_write`] /
//! [`SharedBus::start_read`] plus [`SharedBus::poll`] expose the same
//! machinery nonblockingly in the `nb` style.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::port::{Event, MasterPort};
use crate::transfer::{BusError, Status, Transfer};
use crate::wake::{Completion, Sleep};

/// Interrupt-shared state of one bus unit: the engine plus its completion
/// slot.
///
/// Usable as a `static` once the port type is `Send`; install the engine
/// during bring-up with [`install`](SharedBus::install) before enabling the
/// bus interrupt.
pub struct SharedBus<P: MasterPort, const CAP: usize> {
    transfer: Mutex<RefCell<Option<Transfer<P, CAP>>>>,
    done: Completion,
}

impl<P: MasterPort, const CAP: usize> SharedBus<P, CAP> {
    /// An empty cell, usable in statics.
    pub const fn new() -> Self {
        SharedBus {
            transfer: Mutex::new(RefCell::new(None)),
            done: Completion::new(),
        }
    }

    /// Put the engine for this unit into the cell.
    pub fn install(&self, transfer: Transfer<P, CAP>) {
        critical_section::with(|cs| {
            *self.transfer.borrow_ref_mut(cs) = Some(transfer);
        });
    }

    /// Interrupt entry point: advance the engine and publish the outcome
    /// when the transaction finishes.
    pub fn on_interrupt(&self, event: Event) {
        critical_section::with(|cs| {
            if let Some(transfer) = self.transfer.borrow_ref_mut(cs).as_mut() {
                if let Some(status) = transfer.on_event(event) {
                    self.done.signal(cs, status);
                }
            }
        });
    }

    /// Whether a transaction is in flight.
    pub fn is_busy(&self) -> bool {
        critical_section::with(|cs| {
            self.transfer
                .borrow_ref(cs)
                .as_ref()
                .map_or(false, Transfer::is_busy)
        })
    }

    /// Arm a register write without blocking. Poll with [`poll`](SharedBus::poll).
    pub fn start_write(&self, target: u8, register: u8, data: &[u8]) -> Status {
        self.arm(|t| t.start_write(target, register, data))
    }

    /// Arm a raw (register-less) write without blocking.
    pub fn start_write_raw(&self, target: u8, data: &[u8]) -> Status {
        self.arm(|t| t.start_write_raw(target, data))
    }

    /// Arm a register read without blocking.
    pub fn start_read(&self, target: u8, register: u8, len: usize) -> Status {
        self.arm(|t| t.start_read(target, register, len))
    }

    /// Outcome of the armed transaction, or `WouldBlock` while the bytes are
    /// still moving.
    pub fn poll(&self) -> nb::Result<(), BusError> {
        match self.done.take() {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(nb::Error::Other(e)),
            None => Err(nb::Error::WouldBlock),
        }
    }

    /// Copy the bytes received by the last completed read into `buf`,
    /// returning how many were copied.
    pub fn copy_received(&self, buf: &mut [u8]) -> usize {
        critical_section::with(|cs| {
            match self.transfer.borrow_ref(cs).as_ref() {
                Some(transfer) => {
                    let received = transfer.received();
                    let n = received.len().min(buf.len());
                    buf[..n].copy_from_slice(&received[..n]);
                    n
                }
                None => 0,
            }
        })
    }

    fn arm(&self, op: impl FnOnce(&mut Transfer<P, CAP>) -> Status) -> Status {
        critical_section::with(|cs| {
            match self.transfer.borrow_ref_mut(cs).as_mut() {
                Some(transfer) => {
                    op(transfer)?;
                    // Arm succeeded; drop any outcome a previous caller
                    // abandoned so poll() only sees this transaction.
                    self.done.clear(cs);
                    Ok(())
                }
                None => Err(BusError::Uninitialized),
            }
        })
    }
}

/// Blocking foreground handle to a [`SharedBus`].
///
/// Each operation arms the engine, suspends through `S` until the interrupt
/// handler publishes the outcome, and returns it. Errors are final; retrying
/// a failed transaction is the caller's decision.
pub struct Master<'a, P: MasterPort, S: Sleep, const CAP: usize> {
    bus: &'a SharedBus<P, CAP>,
    sleep: S,
}

impl<'a, P: MasterPort, S: Sleep, const CAP: usize> Master<'a, P, S, CAP> {
    /// Bind a foreground handle to a bus cell.
    pub fn new(bus: &'a SharedBus<P, CAP>, sleep: S) -> Self {
        Master { bus, sleep }
    }

    /// Write `data` to `register` on the device at `target`.
    ///
    /// Returns once every byte has been accepted by the bus and the stop has
    /// gone out, or with the bus error that aborted the transaction.
    pub fn write_register(&mut self, target: u8, register: u8, data: &[u8]) -> Status {
        self.bus.start_write(target, register, data)?;
        self.wait()
    }

    /// Write `data` to the device at `target` with no register byte.
    pub fn write_raw(&mut self, target: u8, data: &[u8]) -> Status {
        self.bus.start_write_raw(target, data)?;
        self.wait()
    }

    /// Read `buf.len()` bytes from `register` on the device at `target`.
    ///
    /// On success `buf` holds exactly the received bytes; on error its
    /// contents are unspecified.
    pub fn read_register(&mut self, target: u8, register: u8, buf: &mut [u8]) -> Status {
        self.bus.start_read(target, register, buf.len())?;
        self.wait()?;
        self.bus.copy_received(buf);
        Ok(())
    }

    /// Nonblocking check for an in-flight transaction.
    pub fn is_busy(&self) -> bool {
        self.bus.is_busy()
    }

    fn wait(&mut self) -> Status {
        loop {
            match self.bus.poll() {
                Ok(()) => return Ok(()),
                Err(nb::Error::Other(e)) => return Err(e),
                Err(nb::Error::WouldBlock) => self.sleep.sleep(),
            }
        }
    }
}
