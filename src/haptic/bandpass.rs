//! Resonant two-pole bandpass (y = x + a·b·y1 − a²·y2, Hz in / Hz out).

use crate::core::util::flush_denorm;
use std::f32::consts::{PI, TAU};

/// Two-pole resonator with pole radius `exp(-π·bw/fs)`, which places the
/// half-power bandwidth at `bw` Hz around the center.
#[derive(Debug, Clone)]
pub struct ResonantBandpass {
    ab: f32,
    a2: f32,
    y1: f32,
    y2: f32,
}

impl ResonantBandpass {
    pub fn new(center_hz: f32, bandwidth_hz: f32, fs: f32) -> Self {
        let mut filter = Self {
            ab: 0.0,
            a2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.retune(center_hz, bandwidth_hz, fs);
        filter
    }

    /// Re-derive coefficients. The delay line is preserved: a click on a
    /// retune is tolerable, losing the oscillation lock is not.
    pub fn retune(&mut self, center_hz: f32, bandwidth_hz: f32, fs: f32) {
        let omega = TAU * center_hz / fs;
        let a = (-PI * bandwidth_hz / fs).exp();
        self.ab = a * 2.0 * omega.cos();
        self.a2 = a * a;
    }

    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = flush_denorm(x + self.ab * self.y1 - self.a2 * self.y2);
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}
