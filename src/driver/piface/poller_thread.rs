//! input polling thread
//! - sleeps for the poll interval, reads the input port, feeds the byte to the inputs register
//! - the inputs register turns changed bits into callback dispatches on this thread
//! - stop is cooperative: the flag is checked at the top of every iteration
//! - a failed read or a failed callback ends the loop, nothing is retried

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::bit_register::BitRegister;
use super::bus::SharedBus;
use super::entity::PollerState;
use crate::common::error::DriverError;
use crate::{error, info, trace, warn};

const LOG_TAG: &str = "poller_thread";

/// number of poll intervals to wait for the loop to observe a stop request
pub const STOP_GRACE_INTERVALS: u32 = 2;

pub struct Poller {
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    state: PollerState,
    thread_handle: Option<thread::JoinHandle<Result<(), DriverError>>>,
}

impl Poller {
    pub fn new(poll_interval: Duration) -> Self {
        Poller {
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            state: PollerState::NotStarted,
            thread_handle: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// false once stop was requested or the loop died on an error
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// start the thread, a poller runs at most once
    pub fn start(&mut self, bus: SharedBus, inputs: Arc<BitRegister>) -> Result<(), DriverError> {
        if self.state != PollerState::NotStarted {
            return Err(DriverError::InvalidArgument(format!(
                "poller cannot be started from state {:?}",
                self.state
            )));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let poll_interval = self.poll_interval;
        self.thread_handle = Some(thread::spawn(move || {
            run_loop(poll_interval, running, bus, inputs)
        }));
        self.state = PollerState::Running;
        info!(LOG_TAG, "poller started, interval: {:?}", self.poll_interval);
        Ok(())
    }

    /// clear the running flag without waiting
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// stop the loop and wait the grace period
    /// - returns the loop's error if it died on one
    /// - a thread still busy after the grace period is detached
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.request_stop();
        let previous = self.state;
        self.state = PollerState::Stopped;
        if previous != PollerState::Running {
            return Ok(())
        }

        thread::sleep(self.poll_interval * STOP_GRACE_INTERVALS);

        let handle = match self.thread_handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        if !handle.is_finished() {
            warn!(LOG_TAG, "poller thread did not exit within {} intervals, detaching", STOP_GRACE_INTERVALS);
            return Ok(())
        }
        match handle.join() {
            Ok(result) => {
                info!(LOG_TAG, "poller stopped");
                result
            }
            Err(_) => Err(DriverError::Callback("poller thread panicked".to_string())),
        }
    }
}

/// the polling loop, runs on the poller thread
pub fn run_loop(
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    bus: SharedBus,
    inputs: Arc<BitRegister>,
) -> Result<(), DriverError> {
    while running.load(Ordering::SeqCst) {
        thread::sleep(poll_interval);
        if let Err(e) = poll_once(&bus, &inputs) {
            error!(LOG_TAG, "polling loop terminated: {}", e);
            running.store(false, Ordering::SeqCst);
            return Err(e)
        }
    }
    trace!(LOG_TAG, "stop flag observed, leaving loop");
    Ok(())
}

/// one read and its dispatch round
pub fn poll_once(bus: &SharedBus, inputs: &BitRegister) -> Result<(), DriverError> {
    let value = bus.read_inputs()?;
    inputs.from_byte(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::driver::device::dummy_bus::DummyBus;
    use std::sync::mpsc;

    const INTERVAL: Duration = Duration::from_millis(10);

    fn setup() -> (DummyBus, SharedBus, Arc<BitRegister>) {
        let _ = init_logger();
        let dummy = DummyBus::new();
        let bus = SharedBus::new(Box::new(dummy.clone()));
        (dummy, bus, Arc::new(BitRegister::new("inputs")))
    }

    #[test]
    fn test_poll_once_feeds_register() {
        let (dummy, bus, inputs) = setup();
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        inputs.on_change(move |index, value| {
            let _ = tx.lock().unwrap().send((index, value));
            Ok(())
        });

        dummy.push_input(0b0000_0001);
        dummy.push_input(0b0000_0011);
        poll_once(&bus, &inputs).unwrap();
        assert_eq!(rx.try_recv().unwrap(), (0, true));

        poll_once(&bus, &inputs).unwrap();
        assert_eq!(rx.try_recv().unwrap(), (1, true));
        assert!(rx.try_recv().is_err());

        // same byte again
        poll_once(&bus, &inputs).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(inputs.to_byte(), 0b0000_0011);
    }

    #[test]
    fn test_thread_dispatches_changes() {
        let (dummy, bus, inputs) = setup();
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        inputs.on_change(move |index, value| {
            let _ = tx.lock().unwrap().send((index, value));
            Ok(())
        });
        dummy.push_input(0b0000_0100);

        let mut poller = Poller::new(INTERVAL);
        poller.start(bus, inputs.clone()).unwrap();
        assert_eq!(poller.state(), PollerState::Running);
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), (2, true));

        poller.stop().unwrap();
        assert_eq!(poller.state(), PollerState::Stopped);
    }

    #[test]
    fn test_no_reads_after_stop() {
        let (dummy, bus, inputs) = setup();
        let mut poller = Poller::new(INTERVAL);
        poller.start(bus, inputs).unwrap();
        thread::sleep(INTERVAL * 5);

        poller.stop().unwrap();
        let reads = dummy.input_reads();
        thread::sleep(INTERVAL * 5);
        assert_eq!(dummy.input_reads(), reads);
        assert!(!poller.is_running());
    }

    #[test]
    fn test_no_restart() {
        let (_, bus, inputs) = setup();
        let mut poller = Poller::new(INTERVAL);
        poller.start(bus.clone(), inputs.clone()).unwrap();
        assert!(matches!(poller.start(bus.clone(), inputs.clone()), Err(DriverError::InvalidArgument(_))));
        poller.stop().unwrap();
        assert!(matches!(poller.start(bus, inputs), Err(DriverError::InvalidArgument(_))));
    }

    #[test]
    fn test_read_failure_is_fatal() {
        let (dummy, bus, inputs) = setup();
        dummy.set_failing(true);
        let mut poller = Poller::new(INTERVAL);
        poller.start(bus, inputs).unwrap();
        thread::sleep(INTERVAL * 5);
        assert!(!poller.is_running());

        let result = poller.stop();
        assert!(matches!(result, Err(DriverError::Transport(_))));
        assert_eq!(dummy.input_reads(), 0);
    }

    #[test]
    fn test_callback_failure_is_fatal() {
        let (dummy, bus, inputs) = setup();
        inputs.on_change(|_, _| Err(DriverError::Callback("handler failed".to_string())));
        dummy.push_input(0xff);

        let mut poller = Poller::new(INTERVAL);
        poller.start(bus, inputs.clone()).unwrap();
        thread::sleep(INTERVAL * 5);

        assert!(matches!(poller.stop(), Err(DriverError::Callback(_))));
        // the failed round was not committed
        assert_eq!(inputs.to_byte(), 0);
        assert_eq!(dummy.input_reads(), 1);
    }

    #[test]
    fn test_stop_before_start() {
        let mut poller = Poller::new(INTERVAL);
        assert!(poller.stop().is_ok());
        assert_eq!(poller.state(), PollerState::Stopped);
    }
}
