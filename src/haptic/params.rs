//! Lock-free parameter and phase cells shared between the control and
//! audio domains.
//!
//! Every cell is a single machine word; the control side stores, the
//! render loop loads. There is no cross-parameter consistency requirement,
//! so relaxed ordering is sufficient; each individual load is tear-free.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// f32 cell bit-cast through an `AtomicU32`.
#[derive(Debug)]
pub struct ParamCell(AtomicU32);

impl ParamCell {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Oscillator phase published by the audio domain, read by the sensor
/// domain. Single writer, single reader.
#[derive(Debug)]
pub struct PhaseCell(AtomicU32);

impl PhaseCell {
    pub fn new() -> Self {
        Self(AtomicU32::new(0.0f32.to_bits()))
    }

    #[inline]
    pub fn store(&self, phase: f32) {
        self.0.store(phase.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Generator branch selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    Sine,
    BandNoise,
    Snow,
}

impl SignalType {
    fn as_u8(self) -> u8 {
        match self {
            SignalType::Sine => 0,
            SignalType::BandNoise => 1,
            SignalType::Snow => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => SignalType::BandNoise,
            2 => SignalType::Snow,
            _ => SignalType::Sine,
        }
    }
}

/// Output channel identifier for the stereo gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
}

/// The synthesizer's live configuration. Setters clamp out-of-range
/// values instead of rejecting them; these arrive from sliders and
/// network commands, and surviving bad input beats signaling it.
#[derive(Debug)]
pub struct SharedParams {
    playing: AtomicBool,
    signal: AtomicU8,
    frequency_hz: ParamCell,
    amplitude: ParamCell,
    velocity: ParamCell,
    noise_bandwidth_hz: ParamCell,
    ch1_enabled: AtomicBool,
    ch2_enabled: AtomicBool,
    ch1_gain: ParamCell,
    ch2_gain: ParamCell,
}

impl SharedParams {
    pub const MIN_FREQUENCY_HZ: f32 = 1.0;
    pub const MAX_FREQUENCY_HZ: f32 = 20_000.0;
    pub const DEFAULT_NOISE_BANDWIDTH_HZ: f32 = 20.0;

    pub fn new(frequency_hz: f32, amplitude: f32) -> Self {
        Self {
            playing: AtomicBool::new(false),
            signal: AtomicU8::new(SignalType::Sine.as_u8()),
            frequency_hz: ParamCell::new(
                frequency_hz.clamp(Self::MIN_FREQUENCY_HZ, Self::MAX_FREQUENCY_HZ),
            ),
            amplitude: ParamCell::new(amplitude.clamp(0.0, 1.0)),
            velocity: ParamCell::new(0.0),
            noise_bandwidth_hz: ParamCell::new(Self::DEFAULT_NOISE_BANDWIDTH_HZ),
            ch1_enabled: AtomicBool::new(true),
            ch2_enabled: AtomicBool::new(true),
            ch1_gain: ParamCell::new(1.0),
            ch2_gain: ParamCell::new(1.0),
        }
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn set_signal(&self, signal: SignalType) {
        self.signal.store(signal.as_u8(), Ordering::Relaxed);
    }

    #[inline]
    pub fn signal(&self) -> SignalType {
        SignalType::from_u8(self.signal.load(Ordering::Relaxed))
    }

    pub fn set_frequency(&self, hz: f32) {
        self.frequency_hz
            .set(hz.clamp(Self::MIN_FREQUENCY_HZ, Self::MAX_FREQUENCY_HZ));
    }

    #[inline]
    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz.get()
    }

    pub fn set_amplitude(&self, amplitude: f32) {
        self.amplitude.set(amplitude.clamp(0.0, 1.0));
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude.get()
    }

    pub fn set_velocity(&self, velocity: f32) {
        self.velocity.set(velocity.clamp(0.0, 1.0));
    }

    #[inline]
    pub fn velocity(&self) -> f32 {
        self.velocity.get()
    }

    pub fn set_noise_bandwidth(&self, hz: f32) {
        self.noise_bandwidth_hz.set(hz.clamp(1.0, 2_000.0));
    }

    #[inline]
    pub fn noise_bandwidth_hz(&self) -> f32 {
        self.noise_bandwidth_hz.get()
    }

    pub fn set_channel_enabled(&self, channel: Channel, enabled: bool) {
        match channel {
            Channel::One => self.ch1_enabled.store(enabled, Ordering::Relaxed),
            Channel::Two => self.ch2_enabled.store(enabled, Ordering::Relaxed),
        }
    }

    pub fn set_channel_gain(&self, channel: Channel, gain: f32) {
        let gain = gain.clamp(0.0, 1.0);
        match channel {
            Channel::One => self.ch1_gain.set(gain),
            Channel::Two => self.ch2_gain.set(gain),
        }
    }

    /// Effective per-channel multipliers (gain, gated by enable).
    #[inline]
    pub fn channel_multipliers(&self) -> (f32, f32) {
        let g1 = if self.ch1_enabled.load(Ordering::Relaxed) {
            self.ch1_gain.get()
        } else {
            0.0
        };
        let g2 = if self.ch2_enabled.load(Ordering::Relaxed) {
            self.ch2_gain.get()
        } else {
            0.0
        };
        (g1, g2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_cell_round_trips() {
        let cell = ParamCell::new(0.25);
        assert_eq!(cell.get(), 0.25);
        cell.set(-40.5);
        assert_eq!(cell.get(), -40.5);
    }

    #[test]
    fn setters_clamp() {
        let p = SharedParams::new(40.0, 0.5);
        p.set_amplitude(7.0);
        assert_eq!(p.amplitude(), 1.0);
        p.set_amplitude(-1.0);
        assert_eq!(p.amplitude(), 0.0);
        p.set_frequency(0.0);
        assert_eq!(p.frequency_hz(), SharedParams::MIN_FREQUENCY_HZ);
        p.set_velocity(2.0);
        assert_eq!(p.velocity(), 1.0);
        p.set_channel_gain(Channel::Two, 9.0);
        assert_eq!(p.channel_multipliers().1, 1.0);
    }

    #[test]
    fn disabled_channel_multiplies_to_zero() {
        let p = SharedParams::new(40.0, 1.0);
        p.set_channel_gain(Channel::One, 0.8);
        p.set_channel_enabled(Channel::One, false);
        let (g1, g2) = p.channel_multipliers();
        assert_eq!(g1, 0.0);
        assert_eq!(g2, 1.0);
    }

    #[test]
    fn signal_type_round_trips() {
        let p = SharedParams::new(40.0, 1.0);
        for s in [SignalType::Sine, SignalType::BandNoise, SignalType::Snow] {
            p.set_signal(s);
            assert_eq!(p.signal(), s);
        }
    }
}
