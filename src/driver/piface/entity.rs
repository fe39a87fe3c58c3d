//! piface internal entities
use std::time::Duration;

use super::prelude::*;
use crate::common::error::DriverError;
use crate::common::setting::{Settings, DEFAULT_DEVICE_ADDRESS, DEFAULT_POLL_INTERVAL_MS};

/// expander registers used by the board
/// the numeric address map belongs to the bus port implementation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Register {
    // io direction, 1 = input
    Iodir,
    // pull-up enable
    Gppu,
    // port value
    Gpio,
}

/// 8-bit half of the expander
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Port {
    // wired to the outputs
    PortA,
    // wired to the switches
    PortB,
}

/// input edge, named after the switch movement
/// inputs are pulled up: a pressed switch reads low
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Edge {
    Pressed,
    Released,
}

impl Edge {
    /// the line level the input settles on after this edge
    pub fn level(self) -> bool {
        match self {
            Edge::Pressed => false,
            Edge::Released => true,
        }
    }
}

impl From<bool> for Edge {
    fn from(level: bool) -> Self {
        if level { Edge::Released } else { Edge::Pressed }
    }
}

/// poller lifecycle, `Stopped` is terminal
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollerState {
    NotStarted,
    Running,
    Stopped,
}

/// runtime configuration of a board
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    pub poll_interval: Duration,
    pub device_address: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            device_address: DEFAULT_DEVICE_ADDRESS,
        }
    }
}

impl BoardConfig {
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        BoardConfig { poll_interval, ..BoardConfig::default() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        BoardConfig {
            poll_interval: Duration::from_millis(settings.board.poll_interval_ms),
            device_address: settings.board.device_address,
        }
    }

    pub fn validate(&self) -> Result<(), DriverError> {
        if self.device_address < MIN_DEVICE_ADDRESS || self.device_address > MAX_DEVICE_ADDRESS {
            return Err(DriverError::InvalidArgument(format!(
                "device address must be between {:#04x} and {:#04x}, got {:#04x}",
                MIN_DEVICE_ADDRESS, MAX_DEVICE_ADDRESS, self.device_address
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(DriverError::InvalidArgument("poll interval must be greater than zero".to_string()));
        }
        Ok(())
    }
}
