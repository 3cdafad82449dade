//! The blocking call path

use tracing::debug;
use ubus_bus_api::BusConnection;
use ubus_util::{check_status, UbusError, UbusResult};

use crate::{encode, lookup_service, ExecutionLock, HostValue, ResponseCollector, Unlocked};

/// One remote call
#[derive(Debug, Clone, Copy)]
pub struct CallRequest<'a> {
    pub service: &'a str,
    pub method: &'a str,
    pub args: &'a HostValue,
    /// Milliseconds to wait for the terminal status, 0 waits forever
    pub timeout_ms: i64,
}

impl CallRequest<'_> {
    /// Check names and timeout, returning the timeout in bus units
    pub fn validate(&self) -> UbusResult<u32> {
        if self.service.is_empty() {
            return Err(UbusError::value("service name must not be empty"));
        }
        if self.method.is_empty() {
            return Err(UbusError::value("method name must not be empty"));
        }
        if self.timeout_ms > i64::from(i32::MAX) {
            return Err(UbusError::value("invalid timeout value"));
        }
        u32::try_from(self.timeout_ms).map_err(|_| UbusError::value("invalid timeout value"))
    }
}

/// Run a call on an open connection.
///
/// Resolves the service, encodes the argument, then blocks on the invoke
/// with `lock` released. Data messages that arrive before the terminal
/// status are returned in order.
pub fn invoke_call<B>(
    connection: &mut B,
    request: &CallRequest<'_>,
    lock: &dyn ExecutionLock,
) -> UbusResult<Vec<HostValue>>
where
    B: BusConnection + ?Sized,
{
    let timeout_ms = request.validate()?;
    let id = lookup_service(connection, request.service)?;
    let msg = encode(request.args)?;

    debug!(
        service = request.service,
        method = request.method,
        id = %id,
        timeout_ms,
        len = msg.len(),
        "Invoking"
    );

    let mut collector = ResponseCollector::new();
    let status = {
        let _unlocked = Unlocked::new(lock);
        connection.invoke(
            id,
            request.method,
            &msg,
            &mut |raw: &[u8]| collector.on_message(raw),
            timeout_ms,
        )
    };
    drop(msg);

    debug!(
        service = request.service,
        method = request.method,
        status = %status,
        responses = collector.responses().len(),
        dropped = collector.dropped(),
        "Invoke finished"
    );

    check_status(status)?;
    Ok(collector.into_responses())
}
