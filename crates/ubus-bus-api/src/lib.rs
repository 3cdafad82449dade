//! Bus library trait interfaces
//!
//! This crate defines the seam between the client core and the library that
//! speaks the bus protocol. It contains no socket code itself; `MockBus` is
//! an in-process bus for tests.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
