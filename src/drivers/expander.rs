//! MCP23008 8-bit GPIO expander over the polled I2C master.
//!
//! Library-only driver: the telemetry firmware does not populate an
//! expander, so nothing in the binary constructs one. Boards that do can
//! build it on any [`I2cController`], the same way `main` builds the IMU.

use super::i2c_master::{I2cController, I2cMaster, Spin, WaitPolicy};
use crate::config::EXPANDER_ADDRESS;

const MCP23008_IODIR_ADDR: u8 = 0x00;
const MCP23008_GPIO_ADDR: u8 = 0x09;
const MCP23008_OLAT_ADDR: u8 = 0x0A;

pub struct Mcp23008<C, W = Spin> {
    bus: I2cMaster<C, W>,
    addr: u8,
    outputs: u8,
}

impl<C: I2cController, W: WaitPolicy> Mcp23008<C, W> {
    pub fn new(bus: I2cMaster<C, W>, addr: u8) -> Self {
        Self {
            bus,
            addr,
            outputs: 0,
        }
    }

    /// `inputs` has a 1 for every pin that should be an input.
    /// Output latches are cleared first so no pin glitches high.
    pub fn init(&mut self, inputs: u8) -> Result<(), W::Error> {
        self.write_outputs(0)?;
        self.bus.write_register(self.addr, MCP23008_IODIR_ADDR, inputs)
    }

    pub fn write_outputs(&mut self, levels: u8) -> Result<(), W::Error> {
        self.bus.write_register(self.addr, MCP23008_OLAT_ADDR, levels)?;
        self.outputs = levels;
        Ok(())
    }

    pub fn set_pin(&mut self, pin: u8, high: bool) -> Result<(), W::Error> {
        let mask = 1 << (pin & 7);
        let levels = if high {
            self.outputs | mask
        } else {
            self.outputs & !mask
        };
        self.write_outputs(levels)
    }

    pub fn read_inputs(&mut self) -> Result<u8, W::Error> {
        self.bus.read_register(self.addr, MCP23008_GPIO_ADDR)
    }

    pub fn read_pin(&mut self, pin: u8) -> Result<bool, W::Error> {
        Ok(self.read_inputs()? & (1 << (pin & 7)) != 0)
    }

    pub fn release(self) -> I2cMaster<C, W> {
        self.bus
    }
}

pub fn create_default_expander<C: I2cController>(bus: I2cMaster<C, Spin>) -> Mcp23008<C, Spin> {
    Mcp23008::new(bus, EXPANDER_ADDRESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::sim::SimBus;

    #[test]
    fn init_clears_latches_then_sets_direction() {
        let mut bus = SimBus::new(EXPANDER_ADDRESS);
        bus.registers[0x0A] = 0xFF;
        bus.registers[0x00] = 0xFF;
        let mut gpio = create_default_expander(I2cMaster::new(bus));

        gpio.init(0b1000_0000).unwrap();

        let bus = gpio.release().release().0;
        assert_eq!(bus.registers[0x0A], 0);
        assert_eq!(bus.registers[0x00], 0b1000_0000);
    }

    #[test]
    fn set_pin_keeps_other_latches() {
        let mut gpio = create_default_expander(I2cMaster::new(SimBus::new(EXPANDER_ADDRESS)));
        gpio.set_pin(0, true).unwrap();
        gpio.set_pin(3, true).unwrap();
        gpio.set_pin(0, false).unwrap();

        let bus = gpio.release().release().0;
        assert_eq!(bus.registers[0x0A], 0b0000_1000);
    }

    #[test]
    fn read_pin_reads_gpio_port() {
        let mut bus = SimBus::new(EXPANDER_ADDRESS);
        bus.registers[0x09] = 0b1000_0001;
        let mut gpio = create_default_expander(I2cMaster::new(bus));

        assert!(gpio.read_pin(7).unwrap());
        assert!(gpio.read_pin(0).unwrap());
        assert!(!gpio.read_pin(1).unwrap());
    }
}
