pub mod piface;
pub mod device;
