use std::fmt;
use std::sync::Arc;

use super::bit_register::BitRegister;
use super::prelude::*;
use crate::common::error::DriverError;

/// a single output line of the board
/// - bound to one bit of the outputs register for its whole life
/// - cheap to clone, clones drive the same bit
#[derive(Clone)]
pub struct OutputHandle {
    index: BitIndex,
    register: Arc<BitRegister>,
}

impl OutputHandle {
    pub(crate) fn new(index: BitIndex, register: Arc<BitRegister>) -> Result<Self, DriverError> {
        if index >= REGISTER_WIDTH {
            return Err(DriverError::InvalidArgument(format!(
                "output index must be between 0 and {}, got {}",
                REGISTER_WIDTH, index
            )));
        }
        Ok(OutputHandle { index, register })
    }

    pub fn index(&self) -> BitIndex {
        self.index
    }

    pub fn state(&self) -> bool {
        // the index was checked on construction
        self.register.get_bit(self.index).unwrap_or(false)
    }

    pub fn on(&self) -> Result<(), DriverError> {
        self.register.set_bit(self.index, true)
    }

    pub fn off(&self) -> Result<(), DriverError> {
        self.register.set_bit(self.index, false)
    }

    pub fn toggle(&self) -> Result<(), DriverError> {
        self.register.set_bit(self.index, !self.state())
    }
}

impl fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputHandle")
            .field("register", &self.register.name())
            .field("index", &self.index)
            .field("state", &self.state())
            .finish()
    }
}
