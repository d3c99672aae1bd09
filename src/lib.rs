//! Interrupt-driven register-transaction engine for eUSCI-style serial bus
//! masters, as found on MSP430 microcontrollers.
//!
//! The engine performs read-register / write-register transactions over a
//! half-duplex byte-stream bus (I2C, or SPI with external chip-select
//! framing). The foreground arms a transaction and suspends; the bus
//! interrupt hands bytes over one at a time and wakes the foreground once
//! the final byte has moved and the stop condition is out. At most one
//! transaction is ever in flight per bus unit, so no locking is needed
//! beyond the single arm/wake rendezvous.
//!
//! # Structure
//!
//! * [`port`] — the [`MasterPort`](port::MasterPort) trait a bus unit
//!   implements, plus the interrupt [`Event`](port::Event) vocabulary.
//! * [`transfer`] — the [`Transfer`](transfer::Transfer) state machine that
//!   runs in interrupt context.
//! * [`wake`] — the [`Completion`](wake::Completion) slot and
//!   [`Sleep`](wake::Sleep) suspend hook joining the two contexts.
//! * [`master`] — [`SharedBus`](master::SharedBus) (the interrupt-shared
//!   cell and ISR entry point) and [`Master`](master::Master) (the blocking
//!   foreground API).
//!
//! # Wiring
//!
//! Bring up the bus unit (clocking, pins, master mode) as usual, wrap it in
//! a [`MasterPort`](port::MasterPort) implementation, and install a
//! [`Transfer`](transfer::Transfer) into a `static`
//! [`SharedBus`](master::SharedBus). The bus interrupt handler decodes its
//! vector register into an [`Event`](port::Event) and calls
//! [`SharedBus::on_interrupt`](master::SharedBus::on_interrupt); on MSP430
//! the handler returns through an LPM0 exit so the suspended foreground
//! resumes. A `critical-section` implementation for the core (for example
//! the `msp430` crate's single-core one) must be linked in.
//!
//! There is no transaction timeout: a bus that never interrupts suspends
//! the foreground indefinitely, so pair the engine with a watchdog if
//! bounded latency matters.

#![no_std]
#![deny(missing_docs)]

#[cfg(test)]
extern crate std;

pub mod master;
pub mod port;
pub mod prelude;
pub mod transfer;
pub mod wake;
