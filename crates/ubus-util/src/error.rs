//! Error taxonomy for the ubus client and the status/errno mapping

use nix::errno::Errno;
use thiserror::Error;

use crate::Status;

/// Connect/disconnect misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,
}

/// Core error type for bus operations
#[derive(Debug, Error)]
pub enum UbusError {
    #[error("Connection state error: {0}")]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service not found: {0}")]
    Lookup(String),

    #[error("Invalid value: {0}")]
    Value(String),

    #[error("Request timed out")]
    TimedOut,

    #[error("Invocation failed: {0}")]
    Invocation(Status),

    #[error("OS error: {0}")]
    Os(Errno),
}

impl UbusError {
    pub fn lookup(name: impl Into<String>) -> Self {
        Self::Lookup(name.into())
    }

    pub fn value(msg: impl Into<String>) -> Self {
        Self::Value(msg.into())
    }

    /// Transport error raised when an operation needs a live connection.
    pub fn not_connected() -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "not connected to ubus",
        ))
    }

    /// Classify a terminal bus status.
    pub fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::Ok => None,
            Status::Timeout => Some(Self::TimedOut),
            other => Some(Self::Invocation(other)),
        }
    }

    /// errno-style number for hosts that raise OSError-shaped exceptions.
    ///
    /// `None` for errors that are raised as value/lookup errors instead.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::State(_) => Some(Errno::EBUSY as i32),
            Self::Io(e) => Some(e.raw_os_error().unwrap_or(Errno::EIO as i32)),
            Self::TimedOut => Some(Errno::ETIMEDOUT as i32),
            Self::Os(errno) => Some(*errno as i32),
            Self::Lookup(_) | Self::Value(_) | Self::Invocation(_) => None,
        }
    }
}

impl From<Errno> for UbusError {
    fn from(errno: Errno) -> Self {
        Self::Os(errno)
    }
}

pub type UbusResult<T> = std::result::Result<T, UbusError>;

/// Turn a terminal bus status into a result.
pub fn check_status(status: Status) -> UbusResult<()> {
    match UbusError::from_status(status) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Check the return value of a syscall-backed operation.
///
/// Negative values are failures and pick up the calling thread's errno.
pub fn check_os(ret: i32) -> UbusResult<i32> {
    if ret < 0 {
        Err(UbusError::Os(Errno::last()))
    } else {
        Ok(ret)
    }
}
