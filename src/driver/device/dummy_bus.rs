//! in-memory bus port, for tests and for running without hardware
//! - input reads are served from a queue, the last value repeats once it runs dry
//! - every transfer is recorded
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::common::error::DriverError;
use crate::driver::piface::bus::INPUT_PORT;
use crate::driver::piface::entity::{Port, Register};
use crate::driver::piface::prelude::*;
use crate::driver::piface::traits::BusPort;
use crate::{debug};

const LOG_TAG: &str = "dummy_bus";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOperation {
    ReadByte(Register, Port),
    WriteByte(Register, RegisterValue, Port),
    ReadWord(Register),
    WriteWord(Register, u16),
}

#[derive(Debug, Default)]
struct DummyBusState {
    pending_inputs: VecDeque<RegisterValue>,
    last_input: RegisterValue,
    registers: HashMap<(Register, Port), RegisterValue>,
    operations: Vec<BusOperation>,
    failing: bool,
    closed: bool,
}

/// clones share the same state, keep one to inspect the bus after handing it to a board
#[derive(Debug, Clone, Default)]
pub struct DummyBus {
    state: Arc<Mutex<DummyBusState>>,
}

impl DummyBus {
    pub fn new() -> Self {
        DummyBus::default()
    }

    /// queue a value for the next input read
    pub fn push_input(&self, value: RegisterValue) {
        self.lock().pending_inputs.push_back(value);
    }

    /// make every following transfer fail
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn operations(&self) -> Vec<BusOperation> {
        self.lock().operations.clone()
    }

    pub fn input_reads(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, BusOperation::ReadByte(Register::Gpio, Port::PortB)))
            .count()
    }

    /// values written to the output port, oldest first
    pub fn output_writes(&self) -> Vec<RegisterValue> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                BusOperation::WriteByte(Register::Gpio, value, Port::PortA) => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, DummyBusState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(state: &DummyBusState, action: &str) -> Result<(), DriverError> {
        if state.closed {
            return Err(DriverError::Transport(format!("dummy bus is closed, cannot {}", action)));
        }
        if state.failing {
            return Err(DriverError::Transport(format!("dummy bus failure on {}", action)));
        }
        Ok(())
    }
}

impl BusPort for DummyBus {
    fn read_byte(&mut self, register: Register, port: Port) -> Result<RegisterValue, DriverError> {
        let mut state = self.lock();
        DummyBus::check(&state, "read")?;
        state.operations.push(BusOperation::ReadByte(register, port));

        let value = if register == Register::Gpio && port == INPUT_PORT {
            if let Some(next) = state.pending_inputs.pop_front() {
                state.last_input = next;
            }
            state.last_input
        } else {
            state.registers.get(&(register, port)).copied().unwrap_or(0)
        };
        debug!(LOG_TAG, "read {:?} {:?}: {:#04x}", register, port, value);
        Ok(value)
    }

    fn write_byte(&mut self, register: Register, value: RegisterValue, port: Port) -> Result<(), DriverError> {
        let mut state = self.lock();
        DummyBus::check(&state, "write")?;
        state.operations.push(BusOperation::WriteByte(register, value, port));
        state.registers.insert((register, port), value);
        debug!(LOG_TAG, "write {:?} {:?}: {:#04x}", register, port, value);
        Ok(())
    }

    fn read_word(&mut self, register: Register) -> Result<u16, DriverError> {
        let mut state = self.lock();
        DummyBus::check(&state, "read")?;
        state.operations.push(BusOperation::ReadWord(register));
        let low = state.registers.get(&(register, Port::PortA)).copied().unwrap_or(0);
        let high = state.registers.get(&(register, Port::PortB)).copied().unwrap_or(0);
        Ok(u16::from_le_bytes([low, high]))
    }

    fn write_word(&mut self, register: Register, value: u16) -> Result<(), DriverError> {
        let mut state = self.lock();
        DummyBus::check(&state, "write")?;
        state.operations.push(BusOperation::WriteWord(register, value));
        let [low, high] = value.to_le_bytes();
        state.registers.insert((register, Port::PortA), low);
        state.registers.insert((register, Port::PortB), high);
        debug!(LOG_TAG, "write word {:?}: {:#06x}", register, value);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.lock().closed = true;
        Ok(())
    }
}
