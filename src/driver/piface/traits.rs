use super::entity::{Port, Register};
use super::prelude::*;
use crate::common::error::DriverError;

// ================= register ====================

/// the object that listens to bit changes of a register
pub trait RegisterListener: Send + Sync {
    /// called once per changed bit with the bit's new value
    fn notify(&self, index: BitIndex, value: bool) -> Result<(), DriverError>;
}

impl<F> RegisterListener for F
where
    F: Fn(BitIndex, bool) -> Result<(), DriverError> + Send + Sync,
{
    fn notify(&self, index: BitIndex, value: bool) -> Result<(), DriverError> {
        self(index, value)
    }
}

// ================= bus ====================

/// synchronous transport to the expander chip
/// every call blocks until the transfer is done
pub trait BusPort: Send {
    fn read_byte(&mut self, register: Register, port: Port) -> Result<RegisterValue, DriverError>;

    fn write_byte(&mut self, register: Register, value: RegisterValue, port: Port) -> Result<(), DriverError>;

    /// read both halves, port A in the low byte
    fn read_word(&mut self, register: Register) -> Result<u16, DriverError>;

    /// write both halves, port A in the low byte
    fn write_word(&mut self, register: Register, value: u16) -> Result<(), DriverError>;

    /// release the transport
    fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
