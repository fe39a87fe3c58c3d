// bit index within a register
pub type BitIndex = usize;
// raw register value
pub type RegisterValue = u8;
// number of bits in a register
pub const REGISTER_WIDTH: usize = 8;
// valid hardware address range of the expander chip
pub const MIN_DEVICE_ADDRESS: u8 = 0x20;
pub const MAX_DEVICE_ADDRESS: u8 = 0x27;
