// Host command bytes and the telemetry line format.

use core::fmt::Write;

use crate::capture::CaptureSlot;
use crate::config::OUTPUT_DECIMALS;

/* ───── Commands ──────────────────────────────────────────────── */
pub const CMD_START_CAPTURE: u8 = b'r';

/* ───── Frames ────────────────────────────────────────────────── */
/// Keeps the write cadence alive while nothing is being captured.
pub const IDLE_FRAME: [u8; 1] = [0x00];
pub const LINE_CAPACITY: usize = 64;

pub type Line = heapless::String<LINE_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    StartCapture,
}

impl Command {
    /// Only the first received byte is significant; anything else is ignored.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes.first() {
            Some(&CMD_START_CAPTURE) => Some(Self::StartCapture),
            _ => None,
        }
    }
}

pub enum Frame {
    Idle,
    Line(Line),
}

impl Frame {
    /// `index raw maf fir iir\r\n`, filter values with a fixed number of
    /// fractional digits.
    pub fn line(index: usize, slot: &CaptureSlot) -> Self {
        let mut line = Line::new();
        if write!(
            line,
            "{} {} {:.*} {:.*} {:.*}\r\n",
            index,
            slot.raw,
            OUTPUT_DECIMALS,
            slot.maf,
            OUTPUT_DECIMALS,
            slot.fir,
            OUTPUT_DECIMALS,
            slot.iir
        )
        .is_err()
        {
            warn!("Telemetry line {} truncated", index);
        }
        Self::Line(line)
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Idle => &IDLE_FRAME,
            Self::Line(line) => line.as_bytes(),
        }
    }
}
