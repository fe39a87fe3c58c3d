//! PiFace Digital I/O board driver
//! - eight outputs, two of them wired to relays
//! - eight inputs polled on a background thread, edges dispatched to callbacks

pub mod common;
pub mod driver;
pub mod entity;

pub use common::error::DriverError;
pub use driver::piface::prelude;
pub use driver::piface::bit_register::BitRegister;
pub use driver::piface::callback_registry::CallbackRegistry;
pub use driver::piface::entity::{BoardConfig, Edge, Port, Register};
pub use driver::piface::output_port::OutputHandle;
pub use driver::piface::piface_digital::PifaceDigital;
pub use driver::piface::traits::{BusPort, RegisterListener};
