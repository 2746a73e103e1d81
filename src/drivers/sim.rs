//! Simulated I2C controller with a single register-file slave, used by the
//! driver unit tests.

use super::i2c_master::{Ack, Condition, Direction, I2cController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Restart,
    Stop,
    Send(u8),
    Recv(u8),
    Ack(Ack),
}

pub struct SimBus {
    pub address: u8,
    pub registers: [u8; 256],
    /// Slave answers its address and data bytes with ACK.
    pub acknowledge: bool,
    /// Polls each condition needs before it reports complete.
    pub latency: u32,
    /// Hardware never completes anything.
    pub stalled: bool,
    pub polls: u32,
    pub events: Vec<BusEvent>,
    pending: u32,
    selected: Option<Direction>,
    expect_address: bool,
    pointer_pending: bool,
    pointer: u8,
    last_ack: Ack,
    rx: u8,
}

impl SimBus {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            registers: [0; 256],
            acknowledge: true,
            latency: 0,
            stalled: false,
            polls: 0,
            events: Vec::new(),
            pending: 0,
            selected: None,
            expect_address: false,
            pointer_pending: false,
            pointer: 0,
            last_ack: Ack::Nack,
            rx: 0,
        }
    }

    fn begin(&mut self, event: BusEvent) {
        self.events.push(event);
        self.pending = self.latency;
    }
}

impl I2cController for SimBus {
    fn assert_start(&mut self) {
        self.expect_address = true;
        self.begin(BusEvent::Start);
    }

    fn assert_restart(&mut self) {
        self.expect_address = true;
        self.begin(BusEvent::Restart);
    }

    fn assert_stop(&mut self) {
        self.selected = None;
        self.begin(BusEvent::Stop);
    }

    fn transmit(&mut self, byte: u8) {
        if self.expect_address {
            self.expect_address = false;
            if self.acknowledge && byte >> 1 == self.address {
                let dir = if byte & 1 == 0 {
                    Direction::Write
                } else {
                    Direction::Read
                };
                self.selected = Some(dir);
                self.pointer_pending = dir == Direction::Write;
                self.last_ack = Ack::Ack;
            } else {
                self.selected = None;
                self.last_ack = Ack::Nack;
            }
        } else if self.selected == Some(Direction::Write) {
            if self.pointer_pending {
                self.pointer = byte;
                self.pointer_pending = false;
            } else {
                self.registers[self.pointer as usize] = byte;
                self.pointer = self.pointer.wrapping_add(1);
            }
            self.last_ack = Ack::Ack;
        } else {
            self.last_ack = Ack::Nack;
        }
        self.begin(BusEvent::Send(byte));
    }

    fn enable_receive(&mut self) {
        self.rx = if self.selected == Some(Direction::Read) {
            let value = self.registers[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
            value
        } else {
            0xFF
        };
        self.begin(BusEvent::Recv(self.rx));
    }

    fn received(&mut self) -> u8 {
        self.rx
    }

    fn assert_ack(&mut self, ack: Ack) {
        self.begin(BusEvent::Ack(ack));
    }

    fn is_complete(&mut self, _condition: Condition) -> bool {
        if self.stalled {
            return false;
        }
        self.polls += 1;
        self.pending = self.pending.saturating_sub(1);
        self.pending == 0
    }

    fn ack_status(&self) -> Ack {
        self.last_ack
    }
}
