//! GPIO pin layer.

pub mod controller;
pub mod mock;
pub mod sysfs;
pub mod traits;

pub use controller::{GpioController, Pin, PinClaim};
pub use mock::MockPinDriver;
pub use sysfs::SysfsPinDriver;
pub use traits::{HardwareError, Level, PinDriver};
