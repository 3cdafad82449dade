//! Host-facing client

use std::path::{Path, PathBuf};
use std::sync::Arc;
use ubus_bus_api::BusConnector;
use ubus_util::{compiled_socket_path, UbusResult};

use crate::{invoke_call, CallRequest, ConnectionManager, ExecutionLock, HostValue, NoLock};

/// A ubus client as exposed to the host: one connection, one call at a time
pub struct UbusClient<C: BusConnector> {
    connection: ConnectionManager<C>,
    lock: Arc<dyn ExecutionLock>,
}

impl<C: BusConnector> UbusClient<C> {
    /// Client for the build-time default socket
    pub fn new(connector: C) -> Self {
        Self::with_socket_path(connector, compiled_socket_path())
    }

    pub fn with_socket_path(connector: C, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            connection: ConnectionManager::new(connector, socket_path),
            lock: Arc::new(NoLock),
        }
    }

    /// Set the lock released around the blocking invoke
    pub fn with_execution_lock(mut self, lock: Arc<dyn ExecutionLock>) -> Self {
        self.lock = lock;
        self
    }

    pub fn connect(&mut self) -> UbusResult<()> {
        self.connection.connect()
    }

    pub fn disconnect(&mut self) -> UbusResult<()> {
        self.connection.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn socket_path(&self) -> &Path {
        self.connection.socket_path()
    }

    /// Call `method` on `service` and collect every response message.
    ///
    /// `timeout_ms` must be within `0..=i32::MAX`; 0 waits forever.
    pub fn call(
        &mut self,
        service: &str,
        method: &str,
        args: &HostValue,
        timeout_ms: i64,
    ) -> UbusResult<Vec<HostValue>> {
        let connection = self.connection.connection_mut()?;
        let request = CallRequest {
            service,
            method,
            args,
            timeout_ms,
        };
        invoke_call(connection, &request, self.lock.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ubus_bus_api::{MockBus, Reply};
    use ubus_util::{Status, UbusError, DEFAULT_SOCKET_PATH};

    #[test]
    fn new_uses_the_build_time_socket() {
        let client = UbusClient::new(MockBus::new());
        assert_eq!(client.socket_path(), Path::new(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn call_requires_a_connection() {
        let bus = MockBus::new();
        bus.add_method("system", "board", |_, _| Reply::Complete(Status::Ok));
        let mut client = UbusClient::with_socket_path(bus.clone(), "/tmp/ubus-test.sock");

        let err = client
            .call("system", "board", &HostValue::dict([("a", 1)]), 1000)
            .unwrap_err();
        assert!(matches!(err, UbusError::Io(_)));
        assert_eq!(bus.stats().lookups, 0);
    }

    #[test]
    fn connected_call_returns_responses() {
        let bus = MockBus::new();
        bus.add_method("system", "board", |_, responder| {
            responder.send(&json!({"hostname": "OpenWrt"}));
            Reply::Complete(Status::Ok)
        });
        let mut client = UbusClient::with_socket_path(bus.clone(), "/tmp/ubus-test.sock");
        client.connect().unwrap();

        let responses = client
            .call("system", "board", &HostValue::Dict(crate::HostDict::new()), 1000)
            .unwrap();
        assert_eq!(responses, vec![HostValue::dict([("hostname", "OpenWrt")])]);
    }

    #[test]
    fn call_after_disconnect_fails() {
        let bus = MockBus::new();
        let mut client = UbusClient::with_socket_path(bus.clone(), "/tmp/ubus-test.sock");
        client.connect().unwrap();
        client.disconnect().unwrap();

        let err = client
            .call("system", "board", &HostValue::dict([("a", 1)]), 1000)
            .unwrap_err();
        assert!(matches!(err, UbusError::Io(_)));
        assert_eq!(bus.stats().connects, 1);
    }
}
