//! Service name resolution

use tracing::debug;
use ubus_bus_api::{BusConnection, BusConnector};
use ubus_util::{ServiceId, Status, UbusError, UbusResult};

use crate::ConnectionManager;

/// Resolve a service name to its current id.
///
/// NOT_FOUND is a lookup error; any other failure status is classified like
/// a call status.
pub fn lookup_service<B>(connection: &mut B, name: &str) -> UbusResult<ServiceId>
where
    B: BusConnection + ?Sized,
{
    match connection.lookup_id(name) {
        Ok(id) => {
            debug!(service = name, id = %id, "Resolved service");
            Ok(id)
        }
        Err(Status::NotFound) => Err(UbusError::lookup(name)),
        Err(status) => Err(UbusError::from_status(status).unwrap_or(UbusError::Invocation(status))),
    }
}

impl<C: BusConnector> ConnectionManager<C> {
    /// Resolve `name` over the open connection
    pub fn resolve(&mut self, name: &str) -> UbusResult<ServiceId> {
        let connection = self.connection_mut()?;
        lookup_service(connection, name)
    }
}
