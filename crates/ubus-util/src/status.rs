//! Bus status codes

use std::fmt;

/// Terminal status reported by the bus for a lookup or an invoke.
///
/// Codes outside the known range are kept verbatim in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    InvalidCommand,
    InvalidArgument,
    MethodNotFound,
    NotFound,
    NoData,
    PermissionDenied,
    Timeout,
    NotSupported,
    UnknownError,
    ConnectionFailed,
    NoMemory,
    ParseError,
    SystemError,
    Other(i32),
}

impl Status {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::InvalidCommand,
            2 => Self::InvalidArgument,
            3 => Self::MethodNotFound,
            4 => Self::NotFound,
            5 => Self::NoData,
            6 => Self::PermissionDenied,
            7 => Self::Timeout,
            8 => Self::NotSupported,
            9 => Self::UnknownError,
            10 => Self::ConnectionFailed,
            11 => Self::NoMemory,
            12 => Self::ParseError,
            13 => Self::SystemError,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::InvalidCommand => 1,
            Self::InvalidArgument => 2,
            Self::MethodNotFound => 3,
            Self::NotFound => 4,
            Self::NoData => 5,
            Self::PermissionDenied => 6,
            Self::Timeout => 7,
            Self::NotSupported => 8,
            Self::UnknownError => 9,
            Self::ConnectionFailed => 10,
            Self::NoMemory => 11,
            Self::ParseError => 12,
            Self::SystemError => 13,
            Self::Other(code) => *code,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Ok => "Success",
            Self::InvalidCommand => "Invalid command",
            Self::InvalidArgument => "Invalid argument",
            Self::MethodNotFound => "Method not found",
            Self::NotFound => "Not found",
            Self::NoData => "No response",
            Self::PermissionDenied => "Permission denied",
            Self::Timeout => "Request timed out",
            Self::NotSupported => "Operation not supported",
            Self::UnknownError => "Unknown error",
            Self::ConnectionFailed => "Connection failed",
            Self::NoMemory => "Out of memory",
            Self::ParseError => "Parsing message data failed",
            Self::SystemError => "System error",
            Self::Other(_) => "Unrecognized status",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_both_ways() {
        for code in 0..=13 {
            assert_eq!(Status::from_code(code).code(), code);
        }
        assert_eq!(Status::from_code(7), Status::Timeout);
        assert_eq!(Status::from_code(4), Status::NotFound);
    }

    #[test]
    fn unknown_codes_are_preserved() {
        let status = Status::from_code(42);
        assert_eq!(status, Status::Other(42));
        assert_eq!(status.code(), 42);
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(Status::MethodNotFound.to_string(), "Method not found (3)");
    }
}
