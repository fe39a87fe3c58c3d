use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::prelude::*;
use super::traits::RegisterListener;
use crate::common::error::DriverError;
use crate::{debug, trace};

const LOG_TAG: &str = "callback_registry";

/// user callback run on an input edge
pub type InputCallback = Arc<dyn Fn() -> Result<(), DriverError> + Send + Sync>;

/// Input callback registry
/// - key is (pin, level after the edge)
/// - callbacks run in registration order, duplicates are kept
/// - registering is safe while the poller is dispatching
#[derive(Default)]
pub struct CallbackRegistry {
    callback_map: Mutex<HashMap<(BitIndex, bool), Vec<InputCallback>>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        CallbackRegistry::default()
    }

    pub fn register<F>(&self, pin: BitIndex, value: bool, callback: F) -> Result<(), DriverError>
    where
        F: Fn() -> Result<(), DriverError> + Send + Sync + 'static,
    {
        if pin >= REGISTER_WIDTH {
            return Err(DriverError::InvalidArgument(format!(
                "pin must be between 0 and {}, got {}",
                REGISTER_WIDTH, pin
            )));
        }
        self.lock_map().entry((pin, value)).or_default().push(Arc::new(callback));
        debug!(LOG_TAG, "callback registered, pin: {}, value: {}", pin, value);
        Ok(())
    }

    pub fn count(&self, pin: BitIndex, value: bool) -> usize {
        self.lock_map().get(&(pin, value)).map_or(0, |callbacks| callbacks.len())
    }

    /// run the callbacks of one edge, the first error stops the round
    pub fn dispatch(&self, pin: BitIndex, value: bool) -> Result<(), DriverError> {
        // copy out so callbacks can register more callbacks
        let callbacks = match self.lock_map().get(&(pin, value)) {
            Some(callbacks) => callbacks.clone(),
            None => {
                trace!(LOG_TAG, "no callback for pin: {}, value: {}", pin, value);
                return Ok(())
            }
        };

        debug!(LOG_TAG, "dispatching {} callback(s), pin: {}, value: {}", callbacks.len(), pin, value);
        for callback in callbacks.iter() {
            callback()?;
        }
        Ok(())
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<(BitIndex, bool), Vec<InputCallback>>> {
        self.callback_map.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// mounted on the inputs register
impl RegisterListener for CallbackRegistry {
    fn notify(&self, index: BitIndex, value: bool) -> Result<(), DriverError> {
        self.dispatch(index, value)
    }
}
