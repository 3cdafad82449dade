//! Shared utilities for the ubus client
//!
//! This crate provides:
//! - ID types (ServiceId)
//! - Bus status codes
//! - The error taxonomy and status/errno mapping
//! - Default paths for the bus socket and config file

mod error;
mod ids;
mod paths;
mod status;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use status::*;
