//! Connection lifecycle

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use ubus_bus_api::BusConnector;
use ubus_util::{StateError, UbusError, UbusResult};

/// Owns the single bus connection
pub struct ConnectionManager<C: BusConnector> {
    connector: C,
    socket_path: PathBuf,
    connection: Option<C::Connection>,
}

impl<C: BusConnector> ConnectionManager<C> {
    pub fn new(connector: C, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            socket_path: socket_path.into(),
            connection: None,
        }
    }

    /// Open the connection.
    ///
    /// Fails with a state error when a connection is already open, and with
    /// an I/O error when the daemon cannot be reached.
    pub fn connect(&mut self) -> UbusResult<()> {
        if self.connection.is_some() {
            return Err(StateError::AlreadyConnected.into());
        }

        let connection = self.connector.connect(&self.socket_path).map_err(|e| {
            warn!(
                socket = %self.socket_path.display(),
                error = %e,
                "Failed to connect to ubus"
            );
            UbusError::Io(e)
        })?;

        info!(socket = %self.socket_path.display(), "Connected to ubus");
        self.connection = Some(connection);
        Ok(())
    }

    /// Close the connection. Nothing is reopened.
    pub fn disconnect(&mut self) -> UbusResult<()> {
        match self.connection.take() {
            Some(connection) => {
                drop(connection);
                info!(socket = %self.socket_path.display(), "Disconnected from ubus");
                Ok(())
            }
            None => Err(StateError::NotConnected.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// The open connection, or an I/O error when there is none
    pub fn connection_mut(&mut self) -> UbusResult<&mut C::Connection> {
        self.connection.as_mut().ok_or_else(UbusError::not_connected)
    }
}
