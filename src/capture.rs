//! Host-triggered 100-sample capture window.

use crate::config::CAPTURE_LEN;
use crate::filters::{self, MovingAverage};

/// One captured sample with every filter output.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureSlot {
    pub raw: i16,
    pub maf: f32,
    pub fir: f32,
    pub iir: f32,
}

pub struct CaptureWindow {
    raw: [i16; CAPTURE_LEN],
    slots: [CaptureSlot; CAPTURE_LEN],
    average: MovingAverage,
    index: usize,
    armed: bool,
}

impl Default for CaptureWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureWindow {
    pub const fn new() -> Self {
        Self {
            raw: [0; CAPTURE_LEN],
            slots: [CaptureSlot {
                raw: 0,
                maf: 0.0,
                fir: 0.0,
                iir: 0.0,
            }; CAPTURE_LEN],
            average: MovingAverage::new(),
            index: 0,
            armed: false,
        }
    }

    /// Clears all filter state and slots, then arms from index 0. Any window
    /// already running is abandoned.
    pub fn start(&mut self) {
        self.discard();
        self.armed = true;
    }

    /// Drops the window without arming a new one.
    pub fn discard(&mut self) {
        *self = Self::new();
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn slots(&self) -> &[CaptureSlot; CAPTURE_LEN] {
        &self.slots
    }

    /// Filters `x` into the current slot and advances. Returns the slot index
    /// and its values, or `None` while disarmed. The window disarms itself
    /// after the last slot and the index wraps back to 0.
    pub fn push(&mut self, x: i16) -> Option<(usize, CaptureSlot)> {
        if !self.armed {
            return None;
        }

        let n = self.index;
        self.raw[n] = x;
        let history = &self.raw[..=n];
        let slot = CaptureSlot {
            raw: x,
            maf: self.average.push(x),
            fir: filters::fir(history, n),
            iir: filters::iir(history, n),
        };
        self.slots[n] = slot;

        self.index += 1;
        if self.index == CAPTURE_LEN {
            self.index = 0;
            self.armed = false;
            info!("Capture complete: {} samples", CAPTURE_LEN);
        }

        Some((n, slot))
    }
}
