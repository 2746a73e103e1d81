use super::i2c_master::{I2cController, I2cMaster, Spin, WaitPolicy};
use crate::config::{IMU_ADDRESS, IMU_CTRL1_XL, IMU_CTRL2_G, IMU_CTRL3_C};

// LSM6DS33 Register Addresses
const LSM6DS33_WHO_AM_I_ADDR: u8 = 0x0F;
const LSM6DS33_CTRL1_XL_ADDR: u8 = 0x10;
const LSM6DS33_CTRL2_G_ADDR: u8 = 0x11;
const LSM6DS33_CTRL3_C_ADDR: u8 = 0x12;
pub const LSM6DS33_OUT_TEMP_L_ADDR: u8 = 0x20;

// LSM6DS33 ID
pub const LSM6DS33_ID: u8 = 0x69;

/// Temperature, gyro XYZ and accel XYZ, two bytes each.
pub const SAMPLE_LEN: usize = 14;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Axes {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// One raw reading of every output channel, in register order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuSample {
    pub temperature: i16,
    pub gyro: Axes,
    pub accel: Axes,
}

/// Selects which scalar of an [`ImuSample`] feeds the filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Temperature,
    GyroX,
    GyroY,
    GyroZ,
    AccelX,
    AccelY,
    AccelZ,
}

impl ImuSample {
    /// Decodes a burst starting at `OUT_TEMP_L`; each channel is little-endian.
    pub fn from_burst(raw: &[u8; SAMPLE_LEN]) -> Self {
        let ch = |k: usize| i16::from_le_bytes([raw[2 * k], raw[2 * k + 1]]);
        Self {
            temperature: ch(0),
            gyro: Axes {
                x: ch(1),
                y: ch(2),
                z: ch(3),
            },
            accel: Axes {
                x: ch(4),
                y: ch(5),
                z: ch(6),
            },
        }
    }

    pub fn channel(&self, channel: Channel) -> i16 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::GyroX => self.gyro.x,
            Channel::GyroY => self.gyro.y,
            Channel::GyroZ => self.gyro.z,
            Channel::AccelX => self.accel.x,
            Channel::AccelY => self.accel.y,
            Channel::AccelZ => self.accel.z,
        }
    }
}

/// Anything the telemetry loop can pull samples from.
pub trait ImuSource {
    #[cfg(feature = "defmt")]
    type Error: core::fmt::Debug + defmt::Format;
    #[cfg(not(feature = "defmt"))]
    type Error: core::fmt::Debug;

    fn read_sample(&mut self) -> Result<ImuSample, Self::Error>;
}

pub struct Lsm6ds33<C, W = Spin> {
    bus: I2cMaster<C, W>,
    addr: u8,
}

impl<C: I2cController, W: WaitPolicy> Lsm6ds33<C, W> {
    pub fn new(bus: I2cMaster<C, W>, addr: u8) -> Self {
        Self { bus, addr }
    }

    /// Reads the identity register, then configures the sensor. A wrong
    /// identity is reported but the sensor is still configured.
    pub fn init(&mut self) -> Result<u8, W::Error> {
        info!("Starting LSM6DS33 initialization sequence...");

        let id = self.who_am_i()?;
        if id == LSM6DS33_ID {
            info!("LSM6DS33 chip ID verified: 0x{:02X}", id);
        } else {
            warn!(
                "Unexpected WHO_AM_I: 0x{:02X}, expected 0x{:02X}",
                id, LSM6DS33_ID
            );
        }

        self.configure()?;
        info!("LSM6DS33 initialization completed");
        Ok(id)
    }

    pub fn who_am_i(&mut self) -> Result<u8, W::Error> {
        self.bus.read_register(self.addr, LSM6DS33_WHO_AM_I_ADDR)
    }

    /// Three independent transactions: accel rate/range, gyro rate/range and
    /// register auto-increment for burst reads.
    pub fn configure(&mut self) -> Result<(), W::Error> {
        self.bus
            .write_register(self.addr, LSM6DS33_CTRL1_XL_ADDR, IMU_CTRL1_XL)?;
        self.bus
            .write_register(self.addr, LSM6DS33_CTRL2_G_ADDR, IMU_CTRL2_G)?;
        self.bus
            .write_register(self.addr, LSM6DS33_CTRL3_C_ADDR, IMU_CTRL3_C)
    }

    /// `buf.len()` must match the number of contiguous registers wanted;
    /// the sensor only auto-increments within one transaction.
    pub fn burst_read(&mut self, start_register: u8, buf: &mut [u8]) -> Result<(), W::Error> {
        self.bus.read_registers(self.addr, start_register, buf)
    }

    pub fn release(self) -> I2cMaster<C, W> {
        self.bus
    }
}

impl<C: I2cController, W: WaitPolicy> ImuSource for Lsm6ds33<C, W> {
    type Error = W::Error;

    fn read_sample(&mut self) -> Result<ImuSample, W::Error> {
        let mut raw = [0u8; SAMPLE_LEN];
        self.burst_read(LSM6DS33_OUT_TEMP_L_ADDR, &mut raw)?;
        Ok(ImuSample::from_burst(&raw))
    }
}

// Factory function to create the default IMU (LSM6DS33)
pub fn create_default_imu<C: I2cController>(
    bus: I2cMaster<C, Spin>,
) -> Lsm6ds33<C, Spin> {
    Lsm6ds33::new(bus, IMU_ADDRESS)
}
