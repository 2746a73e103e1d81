//! Polled I2C master
//! ===========================================================
//!
//! Blocking bus primitives layered on a register-level [`I2cController`].
//! Every primitive requests a hardware action and then polls the matching
//! completion condition through a [`WaitPolicy`]. The primitives must be
//! issued in protocol order by the caller; [`I2cMaster::write_register`] and
//! [`I2cMaster::read_registers`] encode the two sequences the drivers need.

use core::convert::Infallible;

/// Acknowledge bit driven or sampled on the ninth clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Receiver wants another byte (SDA held low).
    Ack,
    /// Receiver is done or absent (SDA left high).
    Nack,
}

/// Transfer direction carried in bit 0 of the address byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// Hardware conditions the master waits on after each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    Start,
    Restart,
    Stop,
    TransmitComplete,
    ReceiveFull,
    AckSent,
}

/// Register-level view of an I2C master peripheral.
///
/// The `assert_*`/`transmit`/`enable_receive` calls only kick the hardware;
/// completion is reported later through [`I2cController::is_complete`], which
/// the wait policy polls. A controller without a state machine of its own may
/// advance its waveform from inside `is_complete`, one non-blocking step per
/// poll.
pub trait I2cController {
    fn assert_start(&mut self);
    fn assert_restart(&mut self);
    fn assert_stop(&mut self);
    fn transmit(&mut self, byte: u8);
    fn enable_receive(&mut self);
    fn received(&mut self) -> u8;
    fn assert_ack(&mut self, ack: Ack);
    fn is_complete(&mut self, condition: Condition) -> bool;
    /// ACK status sampled from the slave after the last transmitted byte.
    fn ack_status(&self) -> Ack;
}

/// How the master waits for a hardware condition.
pub trait WaitPolicy {
    #[cfg(feature = "defmt")]
    type Error: core::fmt::Debug + defmt::Format;
    #[cfg(not(feature = "defmt"))]
    type Error: core::fmt::Debug;

    fn wait_until<F: FnMut() -> bool>(&mut self, condition: F) -> Result<(), Self::Error>;
}

/// Unbounded busy-wait. A slave that never releases the bus stalls forever.
#[derive(Debug, Default, Clone, Copy)]
pub struct Spin;

impl WaitPolicy for Spin {
    type Error = Infallible;

    fn wait_until<F: FnMut() -> bool>(&mut self, mut condition: F) -> Result<(), Infallible> {
        while !condition() {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusTimeout;

/// Busy-wait that gives up after `max_polls` unsuccessful checks.
#[derive(Debug, Clone, Copy)]
pub struct SpinBudget {
    pub max_polls: u32,
}

impl WaitPolicy for SpinBudget {
    type Error = BusTimeout;

    fn wait_until<F: FnMut() -> bool>(&mut self, mut condition: F) -> Result<(), BusTimeout> {
        for _ in 0..self.max_polls {
            if condition() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        if condition() {
            Ok(())
        } else {
            Err(BusTimeout)
        }
    }
}

#[inline]
pub const fn address_byte(addr: u8, dir: Direction) -> u8 {
    (addr << 1) | dir as u8
}

pub struct I2cMaster<C, W = Spin> {
    controller: C,
    wait: W,
}

impl<C: I2cController> I2cMaster<C, Spin> {
    pub fn new(controller: C) -> Self {
        Self::with_policy(controller, Spin)
    }
}

impl<C: I2cController, W: WaitPolicy> I2cMaster<C, W> {
    pub fn with_policy(controller: C, wait: W) -> Self {
        Self { controller, wait }
    }

    pub fn release(self) -> (C, W) {
        (self.controller, self.wait)
    }

    fn complete(&mut self, condition: Condition) -> Result<(), W::Error> {
        let controller = &mut self.controller;
        self.wait
            .wait_until(|| controller.is_complete(condition))
    }

    /* ================= primitives ============================ */

    pub fn start(&mut self) -> Result<(), W::Error> {
        self.controller.assert_start();
        self.complete(Condition::Start)
    }

    /// Repeated start: turns the bus around without releasing it.
    pub fn restart(&mut self) -> Result<(), W::Error> {
        self.controller.assert_restart();
        self.complete(Condition::Restart)
    }

    /// Sends one byte and returns the slave's ACK. A NACK is reported but the
    /// transaction carries on regardless.
    pub fn send(&mut self, byte: u8) -> Result<Ack, W::Error> {
        self.controller.transmit(byte);
        self.complete(Condition::TransmitComplete)?;
        let ack = self.controller.ack_status();
        if ack == Ack::Nack {
            trace!("I2C: no ACK after 0x{:02X}", byte);
        }
        Ok(ack)
    }

    /// Clocks in one byte. Must be followed by [`I2cMaster::ack`].
    pub fn recv(&mut self) -> Result<u8, W::Error> {
        self.controller.enable_receive();
        self.complete(Condition::ReceiveFull)?;
        Ok(self.controller.received())
    }

    pub fn ack(&mut self, ack: Ack) -> Result<(), W::Error> {
        self.controller.assert_ack(ack);
        self.complete(Condition::AckSent)
    }

    pub fn stop(&mut self) -> Result<(), W::Error> {
        self.controller.assert_stop();
        self.complete(Condition::Stop)
    }

    /* ================= register helpers ============================ */

    /// START, address+W, register, value, STOP.
    pub fn write_register(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), W::Error> {
        self.start()?;
        self.send(address_byte(addr, Direction::Write))?;
        self.send(reg)?;
        self.send(value)?;
        self.stop()
    }

    /// Writes the register pointer, restarts into read mode and fills `buf`
    /// from consecutive registers, NACKing only the final byte.
    pub fn read_registers(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), W::Error> {
        self.start()?;
        self.send(address_byte(addr, Direction::Write))?;
        self.send(reg)?;
        self.restart()?;
        self.send(address_byte(addr, Direction::Read))?;

        let last = buf.len().saturating_sub(1);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.recv()?;
            self.ack(if i < last { Ack::Ack } else { Ack::Nack })?;
        }

        self.stop()
    }

    pub fn read_register(&mut self, addr: u8, reg: u8) -> Result<u8, W::Error> {
        let mut buf = [0u8; 1];
        self.read_registers(addr, reg, &mut buf)?;
        Ok(buf[0])
    }
}
