//! ubus client core for embedding in a host scripting environment
//!
//! This crate contains:
//! - The host value model (lists and dicts are shared and may form cycles)
//! - Connection lifecycle (connect / disconnect / is_connected)
//! - Service name resolution
//! - Argument marshaling: host value -> JSON text -> attribute buffer
//! - Response collection: attribute message -> JSON text -> host value
//! - The blocking call path, with the host execution lock released while
//!   the bus is waited on

mod client;
mod collector;
mod connection;
mod invoker;
mod lock;
mod marshal;
mod resolver;
mod value;

pub use client::*;
pub use collector::*;
pub use connection::*;
pub use invoker::*;
pub use lock::*;
pub use marshal::*;
pub use resolver::*;
pub use value::*;
