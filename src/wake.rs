//! Foreground/interrupt rendezvous.
//!
//! The foreground arms a transaction and then suspends; the interrupt handler
//! finishes the transaction and wakes it. [`Completion`] is the single-slot
//! channel carrying the outcome across that boundary, and [`Sleep`] is the
//! suspend hook the blocking API parks on between polls.
//!
//! On an MSP430 the natural [`Sleep`] implementation enters LPM0 and relies
//! on the ISR clearing CPUOFF on exit; any implementation only has to return
//! once an interrupt may have fired since the call.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};

use crate::transfer::Status;

/// Single-slot completion channel.
///
/// Written exactly once per transaction from interrupt context, consumed by
/// the foreground. A fresh arm clears any stale outcome left by a caller
/// that never picked one up.
pub struct Completion {
    slot: Mutex<Cell<Option<Status>>>,
}

impl Completion {
    /// An empty slot, usable in statics.
    pub const fn new() -> Self {
        Completion {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Publish a transaction outcome. Interrupt context; the caller already
    /// holds the critical section.
    pub fn signal(&self, cs: CriticalSection<'_>, status: Status) {
        self.slot.borrow(cs).set(Some(status));
    }

    /// Discard any stale outcome.
    pub fn clear(&self, cs: CriticalSection<'_>) {
        self.slot.borrow(cs).set(None);
    }

    /// Consume the outcome, if one has been published.
    pub fn take(&self) -> Option<Status> {
        critical_section::with(|cs| self.slot.borrow(cs).take())
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

/// Suspend primitive used by the blocking foreground between completion polls.
pub trait Sleep {
    /// Yield the processor until an interrupt may have occurred.
    fn sleep(&mut self);
}

/// Busy-wait [`Sleep`]: polls the completion slot in a tight loop.
///
/// For cores where a low-power wait is not worth the bother, and for hosted
/// test harnesses that deliver interrupts from the wait hook.
pub struct Spin;

impl Sleep for Spin {
    fn sleep(&mut self) {}
}
