//! PiFace Digital board
//! the expander ports are wired as follows:
//! - port A: outputs 0 - 7, relay 0 on output 0, relay 1 on output 1
//! - port B: inputs 0 - 7, switches on inputs 0 - 3, pulled up
//!
//! only one board can sit on the bus, the chip address is not used for routing
//!
//! function:
//! - every change of the outputs register is written to the chip as a whole byte
//! - a poller thread reads the inputs and runs the callbacks registered for each edge
//! - `close` stops the poller, waits two poll intervals, then releases the bus

use std::sync::{Arc, Weak};

use super::bit_register::BitRegister;
use super::bus::SharedBus;
use super::callback_registry::CallbackRegistry;
use super::entity::{BoardConfig, Edge};
use super::output_port::OutputHandle;
use super::poller_thread::Poller;
use super::prelude::*;
use super::traits::{BusPort, RegisterListener};
use crate::common::error::DriverError;
use crate::common::setting::Settings;
use crate::entity::dto::board_state_dto::{bits_of, BoardStateDto};
use crate::{error, info};

const LOG_TAG: &str = "piface_digital";
const DEVICE_CLASS: &str = "controller";
const DEVICE_TYPE: &str = "piface_digital";

pub const RELAY0_OUTPUT: BitIndex = 0;
pub const RELAY1_OUTPUT: BitIndex = 1;

/// writes the whole outputs byte on every output bit change
struct OutputMirror {
    outputs: Weak<BitRegister>,
    bus: SharedBus,
}

impl RegisterListener for OutputMirror {
    fn notify(&self, _index: BitIndex, _value: bool) -> Result<(), DriverError> {
        match self.outputs.upgrade() {
            Some(outputs) => self.bus.write_outputs(outputs.to_byte()),
            None => Ok(()),
        }
    }
}

pub struct PifaceDigital {
    config: BoardConfig,
    bus: SharedBus,
    outputs: Arc<BitRegister>,
    inputs: Arc<BitRegister>,
    output_handles: Vec<OutputHandle>,
    callbacks: Arc<CallbackRegistry>,
    poller: Poller,
    closed: bool,
}

impl PifaceDigital {
    /// initialize the chip and start polling
    pub fn new(bus: Box<dyn BusPort>, config: BoardConfig) -> Result<Self, DriverError> {
        config.validate()?;
        let bus = SharedBus::new(bus);
        bus.init_board()?;

        let outputs = Arc::new(BitRegister::new("outputs"));
        let inputs = Arc::new(BitRegister::new("inputs"));
        let output_handles = (0..REGISTER_WIDTH)
            .map(|index| OutputHandle::new(index, outputs.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        outputs.subscribe(Arc::new(OutputMirror {
            outputs: Arc::downgrade(&outputs),
            bus: bus.clone(),
        }));
        let callbacks = Arc::new(CallbackRegistry::new());
        inputs.subscribe(callbacks.clone());

        // listeners are in place before the first read
        let mut poller = Poller::new(config.poll_interval);
        poller.start(bus.clone(), inputs.clone())?;

        info!(LOG_TAG, "board ready, address: {:#04x}, poll interval: {:?}", config.device_address, config.poll_interval);
        Ok(PifaceDigital {
            config,
            bus,
            outputs,
            inputs,
            output_handles,
            callbacks,
            poller,
            closed: false,
        })
    }

    /// board configured from the `[board]` settings section
    pub fn from_settings(bus: Box<dyn BusPort>) -> Result<Self, DriverError> {
        PifaceDigital::new(bus, BoardConfig::from_settings(Settings::get()))
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn device_address(&self) -> u8 {
        self.config.device_address
    }

    /// run `callback` on the poller thread whenever `pin` sees `edge`
    pub fn register_callback<F>(&self, pin: BitIndex, edge: Edge, callback: F) -> Result<(), DriverError>
    where
        F: Fn() -> Result<(), DriverError> + Send + Sync + 'static,
    {
        self.callbacks.register(pin, edge.level(), callback)
    }

    /// the registry behind `register_callback`, keyed by raw line level
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn inputs(&self) -> &Arc<BitRegister> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Arc<BitRegister> {
        &self.outputs
    }

    pub fn out(&self, index: BitIndex) -> Result<&OutputHandle, DriverError> {
        self.output_handles.get(index).ok_or_else(|| {
            DriverError::InvalidArgument(format!("output index must be between 0 and {}, got {}", REGISTER_WIDTH, index))
        })
    }

    pub fn out0(&self) -> &OutputHandle { &self.output_handles[0] }
    pub fn out1(&self) -> &OutputHandle { &self.output_handles[1] }
    pub fn out2(&self) -> &OutputHandle { &self.output_handles[2] }
    pub fn out3(&self) -> &OutputHandle { &self.output_handles[3] }
    pub fn out4(&self) -> &OutputHandle { &self.output_handles[4] }
    pub fn out5(&self) -> &OutputHandle { &self.output_handles[5] }
    pub fn out6(&self) -> &OutputHandle { &self.output_handles[6] }
    pub fn out7(&self) -> &OutputHandle { &self.output_handles[7] }

    pub fn relay0(&self) -> &OutputHandle { &self.output_handles[RELAY0_OUTPUT] }
    pub fn relay1(&self) -> &OutputHandle { &self.output_handles[RELAY1_OUTPUT] }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn state(&self) -> BoardStateDto {
        BoardStateDto {
            device_class: DEVICE_CLASS.to_string(),
            device_type: DEVICE_TYPE.to_string(),
            device_address: self.config.device_address,
            inputs: bits_of(self.inputs.to_byte()),
            outputs: bits_of(self.outputs.to_byte()),
            polling: self.is_polling(),
        }
    }

    /// stop polling and release the bus
    /// - blocks for two poll intervals
    /// - returns the poller's fatal error, if it died on one
    pub fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(())
        }
        self.closed = true;

        let poll_result = self.poller.stop();
        let bus_result = self.bus.close();
        info!(LOG_TAG, "board closed");
        poll_result?;
        bus_result
    }
}

impl Drop for PifaceDigital {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(LOG_TAG, "board teardown failed: {}", e);
        }
    }
}
