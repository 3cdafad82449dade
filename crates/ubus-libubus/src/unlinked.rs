//! Stand-in used when libubus is not linked

use std::convert::Infallible;
use std::io;
use std::path::Path;
use tracing::debug;
use ubus_blob::BlobBuf;
use ubus_bus_api::BusConnection;
use ubus_util::{ServiceId, Status};

/// Cannot be constructed without the `link` feature
#[derive(Debug)]
pub struct LibUbusConnection(Infallible);

impl LibUbusConnection {
    pub(crate) fn open(socket_path: &Path) -> io::Result<Self> {
        debug!(socket = %socket_path.display(), "libubus support not compiled in");
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "built without libubus support (enable the `link` feature)",
        ))
    }
}

impl BusConnection for LibUbusConnection {
    fn lookup_id(&mut self, _path: &str) -> Result<ServiceId, Status> {
        match self.0 {}
    }

    fn invoke(
        &mut self,
        _id: ServiceId,
        _method: &str,
        _msg: &BlobBuf,
        _on_message: &mut dyn FnMut(&[u8]),
        _timeout_ms: u32,
    ) -> Status {
        match self.0 {}
    }
}
