pub mod expander;
pub mod heartbeat;
pub mod i2c_master;
pub mod imu;
pub mod open_drain;

#[cfg(test)]
pub(crate) mod sim;

pub use expander::Mcp23008;
pub use heartbeat::Heartbeat;
pub use i2c_master::{I2cController, I2cMaster};
pub use imu::{ImuSample, Lsm6ds33};
