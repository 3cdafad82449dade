//! Bus connector backed by the system libubus
//!
//! Linking is opt-in through the `link` feature so the workspace builds and
//! tests on machines without OpenWrt's libraries. Without it, [`LibUbus`]
//! still exists but every connect fails with [`std::io::ErrorKind::Unsupported`].

use std::path::Path;
use ubus_bus_api::BusConnector;

#[cfg(feature = "link")]
mod linked;
#[cfg(feature = "link")]
pub use linked::LibUbusConnection;

#[cfg(not(feature = "link"))]
mod unlinked;
#[cfg(not(feature = "link"))]
pub use unlinked::LibUbusConnection;

/// Connects through libubus
#[derive(Debug, Default, Clone, Copy)]
pub struct LibUbus;

impl LibUbus {
    pub fn new() -> Self {
        Self
    }

    /// Whether this build can reach a real bus
    pub fn is_linked() -> bool {
        cfg!(feature = "link")
    }
}

impl BusConnector for LibUbus {
    type Connection = LibUbusConnection;

    fn connect(&self, socket_path: &Path) -> std::io::Result<LibUbusConnection> {
        LibUbusConnection::open(socket_path)
    }
}
