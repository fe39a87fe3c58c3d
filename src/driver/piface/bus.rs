//! shared bus
//! every transfer goes through one mutex, the poller reads and the caller's
//! output writes never interleave on the wire

use std::sync::{Arc, Mutex, MutexGuard};

use super::entity::{Port, Register};
use super::prelude::*;
use super::traits::BusPort;
use crate::common::error::DriverError;
use crate::{debug, info, trace};

const LOG_TAG: &str = "piface_bus";

// initial register words, port A in the low byte
const GPIO_ALL_LOW: u16 = 0x0000;
// port A drives the outputs, port B reads the switches
const IODIR_PORT_B_INPUT: u16 = 0xFF00;
const GPPU_PORT_B_PULLUP: u16 = 0xFF00;

pub const OUTPUT_PORT: Port = Port::PortA;
pub const INPUT_PORT: Port = Port::PortB;

#[derive(Clone)]
pub struct SharedBus {
    port: Arc<Mutex<Box<dyn BusPort>>>,
}

impl SharedBus {
    pub fn new(port: Box<dyn BusPort>) -> Self {
        SharedBus {
            port: Arc::new(Mutex::new(port)),
        }
    }

    /// configure the expander, issued once when the board is created
    /// IOCON is left at its power-on default
    pub fn init_board(&self) -> Result<(), DriverError> {
        let mut port = self.lock()?;
        port.write_word(Register::Gpio, GPIO_ALL_LOW)?;
        port.write_word(Register::Iodir, IODIR_PORT_B_INPUT)?;
        port.write_word(Register::Gppu, GPPU_PORT_B_PULLUP)?;
        info!(LOG_TAG, "board initialized, outputs on {:?}, inputs on {:?} with pull-ups", OUTPUT_PORT, INPUT_PORT);
        Ok(())
    }

    pub fn read_inputs(&self) -> Result<RegisterValue, DriverError> {
        let value = self.lock()?.read_byte(Register::Gpio, INPUT_PORT)?;
        trace!(LOG_TAG, "inputs read: {:#010b}", value);
        Ok(value)
    }

    pub fn write_outputs(&self, value: RegisterValue) -> Result<(), DriverError> {
        self.lock()?.write_byte(Register::Gpio, value, OUTPUT_PORT)?;
        debug!(LOG_TAG, "outputs written: {:#010b}", value);
        Ok(())
    }

    pub fn close(&self) -> Result<(), DriverError> {
        self.lock()?.close()?;
        info!(LOG_TAG, "bus closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn BusPort>>, DriverError> {
        self.port
            .lock()
            .map_err(|e| DriverError::Transport(format!("bus lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::device::dummy_bus::{BusOperation, DummyBus};

    #[test]
    fn test_init_sequence() {
        let dummy = DummyBus::new();
        let bus = SharedBus::new(Box::new(dummy.clone()));
        bus.init_board().unwrap();
        assert_eq!(dummy.operations(), vec![
            BusOperation::WriteWord(Register::Gpio, 0x0000),
            BusOperation::WriteWord(Register::Iodir, 0xFF00),
            BusOperation::WriteWord(Register::Gppu, 0xFF00),
        ]);
    }

    #[test]
    fn test_read_and_write_ports() {
        let dummy = DummyBus::new();
        dummy.push_input(0b0000_0101);
        let bus = SharedBus::new(Box::new(dummy.clone()));

        assert_eq!(bus.read_inputs().unwrap(), 0b0000_0101);
        bus.write_outputs(0x02).unwrap();
        assert_eq!(dummy.operations(), vec![
            BusOperation::ReadByte(Register::Gpio, Port::PortB),
            BusOperation::WriteByte(Register::Gpio, 0x02, Port::PortA),
        ]);
    }

    #[test]
    fn test_transport_error_propagates() {
        let dummy = DummyBus::new();
        dummy.set_failing(true);
        let bus = SharedBus::new(Box::new(dummy));
        assert!(matches!(bus.read_inputs(), Err(DriverError::Transport(_))));
        assert!(matches!(bus.write_outputs(1), Err(DriverError::Transport(_))));
    }
}
