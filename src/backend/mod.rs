//! Sensor drivers the agent can run on.

pub mod memory;
pub mod synthetic;
pub mod usb;

pub use memory::{MemoryFeed, MemorySensor};
pub use synthetic::{SyntheticConfig, SyntheticSensor};
pub use usb::{enumerate_devices, find_default, DeviceInfo, UsbDevice};
