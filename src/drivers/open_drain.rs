//! Bit-banged I2C controller on two open-drain lines.
//!
//! A request only loads the waveform for one bus action into a small step
//! program. The program runs from [`I2cController::is_complete`]: every poll
//! executes steps until the program ends or SCL was released but still reads
//! low because a slave is stretching the clock. That wait therefore belongs
//! to whatever [`WaitPolicy`](super::i2c_master::WaitPolicy) polls the
//! controller.

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use heapless::Vec;

use super::i2c_master::{Ack, Condition, I2cController};

/// Longest request is a received byte: eight four-step read bits.
const PROGRAM_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Drive SDA low (`false`) or release it (`true`).
    Sda(bool),
    /// Release SCL and hold here until it reads high.
    SclHigh,
    SclLow,
    /// Shift the SDA level into the receive register.
    Sample,
}

pub struct OpenDrainController<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
    half_period_us: u32,
    program: Vec<Step, PROGRAM_LEN>,
    cursor: usize,
    shift: u16,
}

impl<SCL, SDA, D> OpenDrainController<SCL, SDA, D>
where
    SCL: OutputPin + InputPin,
    SDA: OutputPin + InputPin,
    D: DelayUs<u32>,
{
    pub fn new(scl: SCL, sda: SDA, delay: D, frequency_hz: u32) -> Self {
        Self {
            scl,
            sda,
            delay,
            half_period_us: (500_000 / frequency_hz.max(1)).max(1),
            program: Vec::new(),
            cursor: 0,
            shift: 0,
        }
    }

    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    fn load(&mut self, build: impl FnOnce(&mut Vec<Step, PROGRAM_LEN>)) {
        self.program.clear();
        self.cursor = 0;
        self.shift = 0;
        build(&mut self.program);
    }

    fn push(program: &mut Vec<Step, PROGRAM_LEN>, steps: &[Step]) {
        // programs are sized for the longest request
        let _ = program.extend_from_slice(steps);
    }

    fn write_bit(program: &mut Vec<Step, PROGRAM_LEN>, bit: bool) {
        Self::push(program, &[Step::Sda(bit), Step::SclHigh, Step::SclLow]);
    }

    fn read_bit(program: &mut Vec<Step, PROGRAM_LEN>) {
        Self::push(
            program,
            &[Step::Sda(true), Step::SclHigh, Step::Sample, Step::SclLow],
        );
    }

    fn scl_is_high(&self) -> bool {
        self.scl.is_high().unwrap_or(false)
    }

    /// Runs steps until the program ends or SCL is being stretched.
    fn run(&mut self) -> bool {
        while let Some(&step) = self.program.get(self.cursor) {
            match step {
                Step::Sda(true) => {
                    let _ = self.sda.set_high();
                }
                Step::Sda(false) => {
                    let _ = self.sda.set_low();
                }
                Step::SclHigh => {
                    let _ = self.scl.set_high();
                    if !self.scl_is_high() {
                        return false;
                    }
                }
                Step::SclLow => {
                    let _ = self.scl.set_low();
                }
                Step::Sample => {
                    let bit = self.sda.is_high().unwrap_or(true);
                    self.shift = (self.shift << 1) | bit as u16;
                }
            }
            if step != Step::Sample {
                self.delay.delay_us(self.half_period_us);
            }
            self.cursor += 1;
        }
        true
    }
}

impl<SCL, SDA, D> I2cController for OpenDrainController<SCL, SDA, D>
where
    SCL: OutputPin + InputPin,
    SDA: OutputPin + InputPin,
    D: DelayUs<u32>,
{
    fn assert_start(&mut self) {
        self.load(|p| {
            Self::push(
                p,
                &[Step::Sda(true), Step::SclHigh, Step::Sda(false), Step::SclLow],
            )
        });
    }

    fn assert_restart(&mut self) {
        // SCL is low here, so raising SDA first is not a STOP
        self.assert_start();
    }

    fn assert_stop(&mut self) {
        self.load(|p| Self::push(p, &[Step::Sda(false), Step::SclHigh, Step::Sda(true)]));
    }

    fn transmit(&mut self, byte: u8) {
        self.load(|p| {
            for i in (0..8).rev() {
                Self::write_bit(p, byte & (1 << i) != 0);
            }
            Self::read_bit(p);
        });
    }

    fn enable_receive(&mut self) {
        self.load(|p| {
            for _ in 0..8 {
                Self::read_bit(p);
            }
        });
    }

    fn received(&mut self) -> u8 {
        self.shift as u8
    }

    fn assert_ack(&mut self, ack: Ack) {
        self.load(|p| {
            Self::write_bit(p, ack == Ack::Nack);
            Self::push(p, &[Step::Sda(true)]);
        });
    }

    fn is_complete(&mut self, _condition: Condition) -> bool {
        self.run()
    }

    fn ack_status(&self) -> Ack {
        // the ninth clock's sample is the only bit a transmit shifts in
        if self.shift & 1 == 0 {
            Ack::Ack
        } else {
            Ack::Nack
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::i2c_master::{BusTimeout, I2cMaster, SpinBudget};
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Both lines as seen on the wire, plus a scripted slave.
    #[derive(Default)]
    struct Wire {
        scl_released: bool,
        sda_released: bool,
        scl_was_high: bool,
        /// Reads of a released SCL that still see it held low.
        stretch: u32,
        /// Slave never lets go of SCL.
        scl_stuck: bool,
        /// Slave pulls SDA low whenever the master releases it.
        slave_acks: bool,
        /// Bits the slave drives on the next sampled clocks.
        slave_bits: VecDeque<bool>,
        /// Master-driven SDA level at every SCL rising edge.
        edges: Vec<bool>,
        scl_reads: u32,
    }

    struct Scl(Rc<RefCell<Wire>>);
    struct Sda(Rc<RefCell<Wire>>);
    struct NoDelay;

    impl OutputPin for Scl {
        type Error = Infallible;
        fn set_low(&mut self) -> Result<(), Infallible> {
            let mut w = self.0.borrow_mut();
            w.scl_released = false;
            w.scl_was_high = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().scl_released = true;
            Ok(())
        }
    }

    impl InputPin for Scl {
        type Error = Infallible;
        fn is_high(&self) -> Result<bool, Infallible> {
            let mut w = self.0.borrow_mut();
            w.scl_reads += 1;
            let high = if !w.scl_released || w.scl_stuck {
                false
            } else if w.stretch > 0 {
                w.stretch -= 1;
                false
            } else {
                true
            };
            if high && !w.scl_was_high {
                let level = w.sda_released;
                w.edges.push(level);
            }
            w.scl_was_high = high;
            Ok(high)
        }
        fn is_low(&self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    impl OutputPin for Sda {
        type Error = Infallible;
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().sda_released = false;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().sda_released = true;
            Ok(())
        }
    }

    impl InputPin for Sda {
        type Error = Infallible;
        fn is_high(&self) -> Result<bool, Infallible> {
            let mut w = self.0.borrow_mut();
            if let Some(bit) = w.slave_bits.pop_front() {
                return Ok(bit);
            }
            Ok(w.sda_released && !w.slave_acks)
        }
        fn is_low(&self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    impl DelayUs<u32> for NoDelay {
        fn delay_us(&mut self, _us: u32) {}
    }

    type Controller = OpenDrainController<Scl, Sda, NoDelay>;

    fn controller(wire: &Rc<RefCell<Wire>>) -> Controller {
        wire.borrow_mut().scl_released = true;
        wire.borrow_mut().sda_released = true;
        OpenDrainController::new(Scl(wire.clone()), Sda(wire.clone()), NoDelay, 400_000)
    }

    fn bits(byte: u8) -> Vec<bool> {
        (0..8).rev().map(|i| byte & (1 << i) != 0).collect()
    }

    #[test]
    fn requests_do_not_touch_the_bus_until_polled() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut ctrl = controller(&wire);

        ctrl.transmit(0xD6);
        assert!(wire.borrow().edges.is_empty());
        assert_eq!(wire.borrow().scl_reads, 0);

        assert!(ctrl.is_complete(Condition::TransmitComplete));
        assert_eq!(wire.borrow().edges.len(), 9);
    }

    #[test]
    fn transmit_clocks_msb_first_and_samples_ack() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut master = I2cMaster::new(controller(&wire));

        master.start().unwrap();
        wire.borrow_mut().edges.clear();
        assert_eq!(master.send(0xD6).unwrap(), Ack::Nack);

        let mut expected = bits(0xD6);
        expected.push(true); // released for the slave's ACK
        assert_eq!(wire.borrow().edges, expected);

        wire.borrow_mut().slave_acks = true;
        assert_eq!(master.send(0x0F).unwrap(), Ack::Ack);
    }

    #[test]
    fn receive_assembles_slave_bits() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut master = I2cMaster::new(controller(&wire));

        wire.borrow_mut().slave_bits.extend(bits(0x69));
        assert_eq!(master.recv().unwrap(), 0x69);

        wire.borrow_mut().edges.clear();
        master.ack(Ack::Ack).unwrap();
        assert_eq!(wire.borrow().edges, vec![false]);
    }

    #[test]
    fn clock_stretch_is_waited_out_by_the_policy() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut ctrl = controller(&wire);

        ctrl.assert_start();
        wire.borrow_mut().stretch = 3;
        assert!(!ctrl.is_complete(Condition::Start));
        assert!(!ctrl.is_complete(Condition::Start));
        assert!(!ctrl.is_complete(Condition::Start));
        assert!(ctrl.is_complete(Condition::Start));

        let mut master = I2cMaster::with_policy(ctrl, SpinBudget { max_polls: 16 });
        wire.borrow_mut().stretch = 10;
        assert_eq!(master.send(0xD6).map(|_| ()), Ok(()));
    }

    #[test]
    fn stuck_clock_times_out_under_spin_budget() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut master = I2cMaster::with_policy(controller(&wire), SpinBudget { max_polls: 32 });

        wire.borrow_mut().scl_stuck = true;
        assert_eq!(master.start(), Err(BusTimeout));
        assert_eq!(master.read_register(0x6B, 0x0F), Err(BusTimeout));
    }

    #[test]
    fn stop_leaves_both_lines_released() {
        let wire = Rc::new(RefCell::new(Wire::default()));
        let mut master = I2cMaster::new(controller(&wire));

        master.start().unwrap();
        master.send(0xD6).unwrap();
        master.stop().unwrap();

        let w = wire.borrow();
        assert!(w.scl_released);
        assert!(w.sda_released);
    }
}
