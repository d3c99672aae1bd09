//! Prelude

pub use crate::master::{Master, SharedBus};
pub use crate::port::MasterPort as _eusci_master_MasterPort;
pub use crate::port::{Direction, Event, InterruptBits};
pub use crate::transfer::{BusError, Transfer};
pub use crate::wake::Sleep as _eusci_master_Sleep;
pub use crate::wake::{Completion, Spin};
