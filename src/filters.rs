//! Scalar filters applied to the captured channel.
//!
//! `history[..=n]` is the raw sample sequence of the current capture window;
//! anything before index 0 reads as zero.

use crate::config::{FIR_WEIGHTS, IIR_CURRENT_WEIGHT, IIR_PREVIOUS_WEIGHT};

/// Running mean over every sample since the last reset.
#[derive(Debug, Default, Clone, Copy)]
pub struct MovingAverage {
    sum: i64,
    count: u32,
}

impl MovingAverage {
    pub const fn new() -> Self {
        Self { sum: 0, count: 0 }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn push(&mut self, x: i16) -> f32 {
        self.sum += x as i64;
        self.count += 1;
        self.value()
    }

    pub fn value(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f32 / self.count as f32
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[inline]
fn sample_at(history: &[i16], k: isize) -> f32 {
    if k < 0 {
        0.0
    } else {
        history.get(k as usize).copied().unwrap_or(0) as f32
    }
}

/// `Σ w[j] * x[n-j]` with the taps in [`FIR_WEIGHTS`].
pub fn fir(history: &[i16], n: usize) -> f32 {
    fir_with(&FIR_WEIGHTS, history, n)
}

pub fn fir_with<const N: usize>(weights: &[f32; N], history: &[i16], n: usize) -> f32 {
    weights
        .iter()
        .enumerate()
        .map(|(j, w)| w * sample_at(history, n as isize - j as isize))
        .sum()
}

/// Single-pole low-pass on the previous and current raw sample.
pub fn iir(history: &[i16], n: usize) -> f32 {
    IIR_PREVIOUS_WEIGHT * sample_at(history, n as isize - 1)
        + IIR_CURRENT_WEIGHT * sample_at(history, n as isize)
}
