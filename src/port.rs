//! Hardware seam between the transaction engine and a serial bus unit.
//!
//! [`MasterPort`] covers the handful of operations an eUSCI-style master
//! peripheral exposes to software: target addressing, line direction,
//! start/stop framing, single-byte transmit, and interrupt source selection.
//! The engine in [`transfer`](crate::transfer) drives a port one byte at a
//! time from interrupt context; everything else about the peripheral (clock
//! source, dividers, pin routing, addressing mode) is configured before the
//! port is handed over and never touched by the engine.
//!
//! On an I2C unit, start/stop map to bus start/stop conditions and
//! [`set_direction`](MasterPort::set_direction) flips the transmitter/receiver
//! role (UCTR-style). On an SPI unit, start/stop typically assert and release
//! chip select and the direction switch is a no-op.

use bitflags::bitflags;

/// Transfer direction of the master, as seen on the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Master transmitter
    Transmit,
    /// Master receiver
    Receive,
}

bitflags! {
    /// Interrupt sources the engine asks the port to listen for.
    ///
    /// Mirrors the transmit/receive/nack enable bits of an eUSCI IE register.
    /// The engine replaces the whole set at each phase change rather than
    /// toggling individual bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InterruptBits: u8 {
        /// Transmit buffer empty; the previous byte has been accepted.
        const TX_READY = 1 << 0;
        /// A byte has arrived in the receive buffer.
        const RX_READY = 1 << 1;
        /// The target did not acknowledge a byte.
        const NACK = 1 << 2;
        /// Another master won the bus.
        const ARBITRATION_LOST = 1 << 3;
    }
}

/// A single hardware event, decoded from the interrupt vector by the ISR and
/// fed to [`Transfer::on_event`](crate::transfer::Transfer::on_event).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Transmit buffer empty (TXIFG): the engine may push the next byte.
    TxReady,
    /// Receive buffer full (RXIFG), carrying the byte that was clocked in.
    RxReady(u8),
    /// Negative acknowledge from the target (NACKIFG).
    Nack,
    /// Arbitration lost to another master (ALIFG).
    ArbitrationLost,
}

/// Register-level operations of a serial master unit.
///
/// Implementations wrap one physical bus unit. All methods are called either
/// while arming a transaction (foreground, inside a critical section) or from
/// the interrupt handler, never concurrently.
pub trait MasterPort {
    /// Set the target device address for the next transaction.
    fn set_target(&mut self, address: u8);

    /// Switch the unit between transmitter and receiver roles.
    ///
    /// Called before a (repeated) start so the start is issued with the new
    /// role already in effect.
    fn set_direction(&mut self, direction: Direction);

    /// Generate a start condition (or a repeated start mid-transaction).
    fn transmit_start(&mut self);

    /// Generate a stop condition.
    ///
    /// When called right after [`transmit_start`](MasterPort::transmit_start)
    /// (single-byte read), the implementation must hold off until the start
    /// has actually gone out on the line before latching the stop request, as
    /// the eUSCI does with its UCTXSTT/UCTXSTP bits.
    fn transmit_stop(&mut self);

    /// Load one byte into the transmit shift register.
    fn transmit_byte(&mut self, byte: u8);

    /// Replace the set of interrupt sources that may fire.
    ///
    /// An empty set quiesces the unit; pending flags for masked sources must
    /// not be delivered.
    fn listen(&mut self, interrupts: InterruptBits);
}
