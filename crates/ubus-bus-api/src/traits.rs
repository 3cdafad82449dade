//! Bus library traits

use std::path::Path;
use ubus_blob::BlobBuf;
use ubus_util::{ServiceId, Status};

/// Opens connections to the bus daemon
pub trait BusConnector {
    type Connection: BusConnection;

    /// Connect to the daemon listening on `socket_path`
    fn connect(&self, socket_path: &Path) -> std::io::Result<Self::Connection>;
}

/// One open connection to the bus daemon.
///
/// Dropping the connection closes it. A connection serves one request at a
/// time; both methods block the calling thread.
pub trait BusConnection {
    /// Resolve an object path to its current id
    fn lookup_id(&mut self, path: &str) -> Result<ServiceId, Status>;

    /// Invoke `method` on object `id` and wait for the terminal status.
    ///
    /// `on_message` receives every data message that arrives before the
    /// terminal status, as raw attribute bytes. `timeout_ms == 0` waits
    /// without bound.
    fn invoke(
        &mut self,
        id: ServiceId,
        method: &str,
        msg: &BlobBuf,
        on_message: &mut dyn FnMut(&[u8]),
        timeout_ms: u32,
    ) -> Status;
}
