use std::f32::consts::TAU;

/// Wrap an angle to the range [0, 2π).
#[inline]
pub fn wrap_tau(x: f32) -> f32 {
    x.rem_euclid(TAU)
}

/// Advance `phase` by one sample of a `freq_hz` oscillator at `fs` Hz,
/// wrapped to [0, 2π).
#[inline]
pub fn advance(phase: f32, freq_hz: f32, fs: f32) -> f32 {
    wrap_tau(phase + TAU * freq_hz / fs)
}

/// Largest per-sample phase increment for a `freq_hz` oscillator at `fs` Hz.
#[inline]
pub fn max_step(freq_hz: f32, fs: f32) -> f32 {
    TAU * freq_hz / fs
}
