//! 8-bit register with per-bit change notification
//!
//! Notification contract:
//! - `set_bit` commits the new bit first, then notifies. Listeners see the new value.
//! - `from_byte` notifies every changed bit, lowest index first, and commits the
//!   whole byte only after the last notification returned. Listeners that read
//!   the register during a bulk update see the previous state.
//! - a listener error stops the round and is returned to the caller. A failed
//!   `from_byte` leaves the previous state in place.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::prelude::*;
use super::traits::RegisterListener;
use crate::common::error::DriverError;
use crate::{debug};

const LOG_TAG: &str = "bit_register";

pub struct BitRegister {
    name: String,
    bits: Mutex<RegisterValue>,
    listeners: RwLock<Vec<Arc<dyn RegisterListener>>>,
}

impl BitRegister {
    pub fn new(name: &str) -> Self {
        BitRegister::with_byte(name, 0)
    }

    pub fn with_byte(name: &str, initial: RegisterValue) -> Self {
        BitRegister {
            name: name.to_string(),
            bits: Mutex::new(initial),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// add a listener, listeners are notified in subscription order
    pub fn subscribe(&self, listener: Arc<dyn RegisterListener>) {
        // a poisoned lock only means a listener panicked, the vec is still intact
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    /// subscribe a closure
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(BitIndex, bool) -> Result<(), DriverError> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(listener));
    }

    pub fn get_bit(&self, index: BitIndex) -> Result<bool, DriverError> {
        check_index(index)?;
        Ok(*self.lock_bits() & mask(index) != 0)
    }

    pub fn set_bit(&self, index: BitIndex, value: bool) -> Result<(), DriverError> {
        check_index(index)?;
        {
            let mut bits = self.lock_bits();
            if (*bits & mask(index) != 0) == value {
                return Ok(())
            }
            if value {
                *bits |= mask(index);
            } else {
                *bits &= !mask(index);
            }
        }
        debug!(LOG_TAG, "{} bit changed, index: {}, value: {}", &self.name, index, value);
        self.notify(index, value)
    }

    pub fn to_byte(&self) -> RegisterValue {
        *self.lock_bits()
    }

    /// replace all bits at once, see the module docs for the ordering contract
    pub fn from_byte(&self, value: RegisterValue) -> Result<(), DriverError> {
        let current = self.to_byte();
        if current == value {
            return Ok(())
        }

        let changed = current ^ value;
        debug!(LOG_TAG, "{} byte changed, old: {:#010b}, new: {:#010b}", &self.name, current, value);
        for index in 0..REGISTER_WIDTH {
            if changed & mask(index) != 0 {
                self.notify(index, value & mask(index) != 0)?;
            }
        }

        *self.lock_bits() = value;
        Ok(())
    }

    fn notify(&self, index: BitIndex, value: bool) -> Result<(), DriverError> {
        // snapshot so listeners may subscribe or touch the register themselves
        let listeners: Vec<Arc<dyn RegisterListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners.iter() {
            listener.notify(index, value)?;
        }
        Ok(())
    }

    fn lock_bits(&self) -> MutexGuard<'_, RegisterValue> {
        self.bits.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn check_index(index: BitIndex) -> Result<(), DriverError> {
    if index >= REGISTER_WIDTH {
        return Err(DriverError::InvalidArgument(format!(
            "bit index must be between 0 and {}, got {}",
            REGISTER_WIDTH, index
        )));
    }
    Ok(())
}

fn mask(index: BitIndex) -> RegisterValue {
    1 << index
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type EventLog = Arc<Mutex<Vec<(BitIndex, bool)>>>;

    fn recording_register(initial: RegisterValue) -> (BitRegister, EventLog) {
        let register = BitRegister::with_byte("test", initial);
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        register.on_change(move |index, value| {
            sink.lock().unwrap().push((index, value));
            Ok(())
        });
        (register, events)
    }

    #[test]
    fn test_set_then_get() {
        let register = BitRegister::new("test");
        for index in 0..REGISTER_WIDTH {
            for value in [true, false, true] {
                register.set_bit(index, value).unwrap();
                assert_eq!(register.get_bit(index).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_index_out_of_range() {
        let register = BitRegister::new("test");
        assert!(matches!(register.get_bit(8), Err(DriverError::InvalidArgument(_))));
        assert!(matches!(register.set_bit(8, true), Err(DriverError::InvalidArgument(_))));
        assert_eq!(register.to_byte(), 0);
    }

    #[test]
    fn test_set_bit_notifies_only_on_change() {
        let (register, events) = recording_register(0);
        register.set_bit(3, true).unwrap();
        register.set_bit(3, true).unwrap();
        register.set_bit(3, false).unwrap();
        assert_eq!(*events.lock().unwrap(), vec![(3, true), (3, false)]);
    }

    #[test]
    fn test_to_byte_lsb_first() {
        let register = BitRegister::new("test");
        register.set_bit(0, true).unwrap();
        register.set_bit(7, true).unwrap();
        assert_eq!(register.to_byte(), 0b1000_0001);
    }

    #[test]
    fn test_from_own_byte_is_silent() {
        let (register, events) = recording_register(0b0101_1010);
        register.from_byte(register.to_byte()).unwrap();
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(register.to_byte(), 0b0101_1010);
    }

    #[test]
    fn test_from_byte_notifies_each_changed_bit_ascending() {
        let samples: [(u8, u8); 5] = [(0x00, 0xff), (0xff, 0x00), (0b1010_1010, 0b0101_0101), (0x01, 0x03), (0x80, 0x81)];
        for (old, new) in samples {
            let (register, events) = recording_register(old);
            register.from_byte(new).unwrap();

            let events = events.lock().unwrap();
            assert_eq!(events.len() as u32, (old ^ new).count_ones());
            let expected: Vec<(BitIndex, bool)> = (0..REGISTER_WIDTH)
                .filter(|i| (old ^ new) & (1 << i) != 0)
                .map(|i| (i, new & (1 << i) != 0))
                .collect();
            assert_eq!(*events, expected);
            assert_eq!(register.to_byte(), new);
        }
    }

    #[test]
    fn test_from_byte_listener_sees_previous_state() {
        let register = Arc::new(BitRegister::with_byte("test", 0b0000_0001));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&register);
        let sink = seen.clone();
        register.on_change(move |_, _| {
            if let Some(register) = weak.upgrade() {
                sink.lock().unwrap().push(register.to_byte());
            }
            Ok(())
        });

        register.from_byte(0b0000_0110).unwrap();
        // three bits changed, every listener call saw the old byte
        assert_eq!(*seen.lock().unwrap(), vec![1, 1, 1]);
        assert_eq!(register.to_byte(), 0b0000_0110);

        register.set_bit(0, true).unwrap();
        // single-bit writes commit before notifying
        assert_eq!(seen.lock().unwrap().last(), Some(&0b0000_0111));
    }

    #[test]
    fn test_listeners_in_subscription_order() {
        let register = BitRegister::new("test");
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let sink = order.clone();
            register.on_change(move |_, _| {
                sink.lock().unwrap().push(id);
                Ok(())
            });
        }
        register.set_bit(1, true).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_failing_listener_aborts_bulk_update() {
        let (register, events) = recording_register(0);
        register.on_change(|index, _| {
            if index == 2 {
                return Err(DriverError::Callback("boom".to_string()));
            }
            Ok(())
        });

        let result = register.from_byte(0b0000_0111);
        assert!(matches!(result, Err(DriverError::Callback(_))));
        // bits 0 and 1 were reported, bit 2 failed, nothing was committed
        assert_eq!(*events.lock().unwrap(), vec![(0, true), (1, true), (2, true)]);
        assert_eq!(register.to_byte(), 0);
    }
}
