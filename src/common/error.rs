use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // bit index, pin or device address out of range
    InvalidArgument = 1001,
    // bus read/write failed
    TransportError = 1002,
    // user callback failed during dispatch
    CallbackError = 1003,
    // settings file unreadable or malformed
    ConfigError = 1004,
}

/// driver error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    InvalidArgument(String),
    Transport(String),
    Callback(String),
    Config(String),
}

impl DriverError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DriverError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            DriverError::Transport(_) => ErrorCode::TransportError,
            DriverError::Callback(_) => ErrorCode::CallbackError,
            DriverError::Config(_) => ErrorCode::ConfigError,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            DriverError::InvalidArgument(msg)
            | DriverError::Transport(msg)
            | DriverError::Callback(msg)
            | DriverError::Config(msg) => msg.as_str(),
        }
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "driver error code: {}, msg: {}", self.code() as u16, self.msg())
    }
}

impl Error for DriverError {}
