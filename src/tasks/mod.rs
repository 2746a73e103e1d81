pub mod telemetry;
pub mod usb;

pub use telemetry::telemetry_task;
pub use usb::{cdc_task, init_usb, usb_device_task};
