pub mod prelude;
pub mod entity;
pub mod traits;
pub mod bit_register;
pub mod output_port;
pub mod callback_registry;
pub mod bus;
pub mod poller_thread;
pub mod piface_digital;
