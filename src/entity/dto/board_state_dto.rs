//! board state data transmission object

use serde_derive::{Deserialize, Serialize};

use crate::common::error::DriverError;
use crate::driver::piface::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStateDto {
    pub device_class: String,
    pub device_type: String,
    pub device_address: u8,
    // input line levels, index 0 first
    pub inputs: Vec<bool>,
    // output line levels, index 0 first
    pub outputs: Vec<bool>,
    pub polling: bool,
}

impl BoardStateDto {
    pub fn to_json(&self) -> Result<String, DriverError> {
        serde_json::to_string(self).map_err(|e| DriverError::Config(format!("cannot serialize board state: {}", e)))
    }
}

/// unpack a register value, bit 0 first
pub fn bits_of(value: RegisterValue) -> Vec<bool> {
    (0..REGISTER_WIDTH).map(|index| value & (1 << index) != 0).collect()
}
