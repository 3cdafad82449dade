//! Mock bus for testing
//!
//! Services live in process. Each invoke runs the method handler as a
//! blocking task on a per-connection tokio runtime; the handler pushes data
//! messages through a channel that the invoke drains until the terminal
//! status arrives or the deadline passes.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use ubus_blob::{to_json_value, BlobBuf};
use ubus_util::{ServiceId, Status};

use crate::{BusConnection, BusConnector};

/// How a mock handler finishes a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Send the terminal status
    Complete(Status),
    /// Never answer; the caller runs into its timeout
    Silent,
}

enum MockEvent {
    Data(Vec<u8>),
    Complete(Status),
}

/// Sends data messages back to the caller of an outstanding request
pub struct Responder {
    tx: mpsc::UnboundedSender<MockEvent>,
}

impl Responder {
    /// Send a JSON object as one data message
    pub fn send(&self, value: &Value) {
        match BlobBuf::from_json(value) {
            Ok(buf) => self.send_raw(buf.as_bytes()),
            Err(e) => warn!(error = %e, "Mock reply is not encodable, skipping"),
        }
    }

    /// Send arbitrary bytes as one data message
    pub fn send_raw(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.tx.send(MockEvent::Data(bytes.into()));
    }
}

/// Method handler: receives the decoded request arguments
pub type MockHandler = Arc<dyn Fn(&Value, &Responder) -> Reply + Send + Sync>;

struct MockService {
    id: ServiceId,
    methods: HashMap<String, MockHandler>,
}

/// Counters for asserting what the client did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MockStats {
    pub connects: usize,
    pub open_connections: usize,
    pub lookups: usize,
    pub invocations: usize,
}

#[derive(Default)]
struct MockState {
    services: HashMap<String, MockService>,
    next_id: u32,
    stats: MockStats,
    last_socket: Option<PathBuf>,
}

/// In-process bus for unit/integration testing
#[derive(Clone)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,

    /// Configure connect to fail
    pub fail_connect: Arc<Mutex<bool>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_id: 0x1000,
                ..Default::default()
            })),
            fail_connect: Arc::new(Mutex::new(false)),
        }
    }

    /// Register a service object, returning its id.
    ///
    /// Registering an existing name again gives it a fresh id and drops its
    /// methods, like a service restart.
    pub fn add_service(&self, name: &str) -> ServiceId {
        let mut state = self.state.lock().unwrap();
        let id = ServiceId::new(state.next_id);
        state.next_id += 1;
        state.services.insert(
            name.to_string(),
            MockService {
                id,
                methods: HashMap::new(),
            },
        );
        id
    }

    /// Register a method, creating the service if needed
    pub fn add_method<F>(&self, service: &str, method: &str, handler: F)
    where
        F: Fn(&Value, &Responder) -> Reply + Send + Sync + 'static,
    {
        let exists = self.state.lock().unwrap().services.contains_key(service);
        if !exists {
            self.add_service(service);
        }

        let mut state = self.state.lock().unwrap();
        if let Some(svc) = state.services.get_mut(service) {
            svc.methods.insert(method.to_string(), Arc::new(handler));
        }
    }

    /// Unregister a service, as if its process exited
    pub fn remove_service(&self, name: &str) {
        self.state.lock().unwrap().services.remove(name);
    }

    pub fn stats(&self) -> MockStats {
        self.state.lock().unwrap().stats
    }

    /// Socket path of the most recent connect
    pub fn last_socket_path(&self) -> Option<PathBuf> {
        self.state.lock().unwrap().last_socket.clone()
    }

    pub fn set_fail_connect(&self, fail: bool) {
        *self.fail_connect.lock().unwrap() = fail;
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConnector for MockBus {
    type Connection = MockConnection;

    fn connect(&self, socket_path: &Path) -> std::io::Result<MockConnection> {
        if *self.fail_connect.lock().unwrap() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "mock bus refused the connection",
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let mut state = self.state.lock().unwrap();
        state.stats.connects += 1;
        state.stats.open_connections += 1;
        state.last_socket = Some(socket_path.to_path_buf());

        Ok(MockConnection {
            state: self.state.clone(),
            runtime,
        })
    }
}

/// Connection to a [`MockBus`]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    runtime: Runtime,
}

impl BusConnection for MockConnection {
    fn lookup_id(&mut self, path: &str) -> Result<ServiceId, Status> {
        let mut state = self.state.lock().unwrap();
        state.stats.lookups += 1;
        state
            .services
            .get(path)
            .map(|svc| svc.id)
            .ok_or(Status::NotFound)
    }

    fn invoke(
        &mut self,
        id: ServiceId,
        method: &str,
        msg: &BlobBuf,
        on_message: &mut dyn FnMut(&[u8]),
        timeout_ms: u32,
    ) -> Status {
        let handler = {
            let mut state = self.state.lock().unwrap();
            state.stats.invocations += 1;
            let Some(service) = state.services.values().find(|svc| svc.id == id) else {
                return Status::NotFound;
            };
            match service.methods.get(method) {
                Some(handler) => handler.clone(),
                None => return Status::MethodNotFound,
            }
        };

        let args = match to_json_value(msg.as_bytes()) {
            Ok(args) => args,
            Err(e) => {
                warn!(error = %e, "Mock request arguments are malformed");
                return Status::InvalidArgument;
            }
        };

        debug!(id = %id, method, "Mock invoke");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let responder = Responder { tx };

        self.runtime.block_on(async move {
            // The responder moves into the task, so the channel closes once
            // the handler returns.
            let _worker = tokio::task::spawn_blocking(move || {
                if let Reply::Complete(status) = handler(&args, &responder) {
                    let _ = responder.tx.send(MockEvent::Complete(status));
                }
            });

            let deadline = async move {
                if timeout_ms == 0 {
                    std::future::pending::<()>().await;
                } else {
                    tokio::time::sleep(Duration::from_millis(timeout_ms.into())).await;
                }
            };
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(MockEvent::Data(bytes)) => on_message(&bytes),
                        Some(MockEvent::Complete(status)) => return status,
                        None => break,
                    },
                    () = &mut deadline => return Status::Timeout,
                }
            }

            // Handler returned without a terminal status
            deadline.await;
            Status::Timeout
        })
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.stats.open_connections = state.stats.open_connections.saturating_sub(1);
        }
    }
}
