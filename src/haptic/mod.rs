//! Haptic drive synthesis: phase-coherent stereo samples for a bass
//! shaker, with the sine-oscillator phase exported for the canceller.

pub mod bandpass;
pub mod params;

pub use bandpass::ResonantBandpass;
pub use params::{Channel, ParamCell, PhaseCell, SharedParams, SignalType};

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::core::phase::advance;

/// Snow texture band centers and bandwidths, Hz.
pub const SNOW_LOW_HZ: f32 = 20.0;
pub const SNOW_LOW_BW_HZ: f32 = 8.0;
pub const SNOW_MID_HZ: f32 = 32.0;
pub const SNOW_MID_BW_HZ: f32 = 15.0;
pub const SNOW_HIGH_HZ: f32 = 100.0;
pub const SNOW_HIGH_BW_HZ: f32 = 40.0;

/// Gain compensation applied after the band-noise resonator.
const BAND_NOISE_SCALE: f32 = 0.3;

/// Velocity-dependent band gains for the snow texture.
///
/// The low band is always present (structural rumble), the mid band grows
/// linearly with speed, and the high band fades in quadratically so ice
/// crystal sizzle only dominates at high velocity.
#[inline]
pub fn snow_band_gains(velocity: f32) -> (f32, f32, f32) {
    let v = velocity.clamp(0.0, 1.0);
    (0.5 + 0.3 * v, 0.2 + 0.5 * v, 0.4 * v * v)
}

/// Three independent white-noise sources driving three resonators.
struct SnowTexture {
    low: ResonantBandpass,
    mid: ResonantBandpass,
    high: ResonantBandpass,
    rng_low: SmallRng,
    rng_mid: SmallRng,
    rng_high: SmallRng,
}

impl SnowTexture {
    fn new(fs: f32, seed: u64) -> Self {
        Self {
            low: ResonantBandpass::new(SNOW_LOW_HZ, SNOW_LOW_BW_HZ, fs),
            mid: ResonantBandpass::new(SNOW_MID_HZ, SNOW_MID_BW_HZ, fs),
            high: ResonantBandpass::new(SNOW_HIGH_HZ, SNOW_HIGH_BW_HZ, fs),
            rng_low: SmallRng::seed_from_u64(seed),
            rng_mid: SmallRng::seed_from_u64(seed.wrapping_add(1)),
            rng_high: SmallRng::seed_from_u64(seed.wrapping_add(2)),
        }
    }

    fn retune(&mut self, fs: f32) {
        self.low.retune(SNOW_LOW_HZ, SNOW_LOW_BW_HZ, fs);
        self.mid.retune(SNOW_MID_HZ, SNOW_MID_BW_HZ, fs);
        self.high.retune(SNOW_HIGH_HZ, SNOW_HIGH_BW_HZ, fs);
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }

    #[inline]
    fn next(&mut self, velocity: f32) -> f32 {
        let low = self.low.process(self.rng_low.random_range(-1.0..1.0));
        let mid = self.mid.process(self.rng_mid.random_range(-1.0..1.0));
        let high = self.high.process(self.rng_high.random_range(-1.0..1.0));
        let (g_low, g_mid, g_high) = snow_band_gains(velocity);
        (low * g_low + mid * g_mid + high * g_high) * 0.25 * (0.5 + velocity)
    }
}

/// Stereo sample generator for the bass shaker.
///
/// The sine oscillator advances for every signal type while playing, so
/// the exported phase stays usable as a cancellation reference even under
/// the noise textures. Parameters are read live from [`SharedParams`];
/// filter coefficients are re-derived only when the relevant parameter
/// actually changed, never per sample.
pub struct HapticSynth {
    fs: f32,
    params: Arc<SharedParams>,
    phase_cell: Arc<PhaseCell>,
    phase: f32,
    band_noise: ResonantBandpass,
    band_rng: SmallRng,
    band_center_hz: f32,
    band_bw_hz: f32,
    snow: SnowTexture,
}

impl HapticSynth {
    pub fn new(fs: f32, params: Arc<SharedParams>, phase_cell: Arc<PhaseCell>) -> Self {
        Self::with_seed(fs, params, phase_cell, 0x5eed_ba55)
    }

    pub fn with_seed(
        fs: f32,
        params: Arc<SharedParams>,
        phase_cell: Arc<PhaseCell>,
        seed: u64,
    ) -> Self {
        let band_center_hz = params.frequency_hz();
        let band_bw_hz = params.noise_bandwidth_hz();
        Self {
            fs,
            params,
            phase_cell,
            phase: 0.0,
            band_noise: ResonantBandpass::new(band_center_hz, band_bw_hz, fs),
            band_rng: SmallRng::seed_from_u64(seed),
            band_center_hz,
            band_bw_hz,
            snow: SnowTexture::new(fs, seed.wrapping_add(7)),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.fs
    }

    /// Re-derive every bandpass for a new device rate; delay lines are
    /// preserved.
    pub fn set_sample_rate(&mut self, fs: f32) {
        self.fs = fs;
        self.band_noise.retune(self.band_center_hz, self.band_bw_hz, fs);
        self.snow.retune(fs);
    }

    /// Current sine-oscillator phase in [0, 2π).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Zero the oscillator and filter states. The only operation allowed
    /// to break phase continuity.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.phase_cell.store(0.0);
        self.band_noise.reset();
        self.snow.reset();
    }

    /// Fill `out` with interleaved stereo frames. Never allocates, never
    /// locks, never fails; returns the number of frames written.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        let frames = out.len() / 2;

        if !self.params.is_playing() {
            out[..frames * 2].fill(0.0);
            return frames;
        }

        for i in 0..frames {
            let frequency = self.params.frequency_hz();
            let amplitude = self.params.amplitude();
            let signal = self.params.signal();

            let s = match signal {
                SignalType::Sine => amplitude * self.phase.sin(),
                SignalType::BandNoise => {
                    let bw = self.params.noise_bandwidth_hz();
                    if frequency != self.band_center_hz || bw != self.band_bw_hz {
                        self.band_center_hz = frequency;
                        self.band_bw_hz = bw;
                        self.band_noise.retune(frequency, bw, self.fs);
                    }
                    let white = self.band_rng.random_range(-1.0..1.0);
                    amplitude * BAND_NOISE_SCALE * self.band_noise.process(white)
                }
                SignalType::Snow => amplitude * self.snow.next(self.params.velocity()),
            };

            // The oscillator runs regardless of the selected generator.
            self.phase = advance(self.phase, frequency, self.fs);
            self.phase_cell.store(self.phase);

            let (g1, g2) = self.params.channel_multipliers();
            out[2 * i] = s * g1;
            out[2 * i + 1] = s * g2;
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::phase::max_step;
    use std::f32::consts::TAU;

    fn make_synth(fs: f32) -> (HapticSynth, Arc<SharedParams>, Arc<PhaseCell>) {
        let params = Arc::new(SharedParams::new(40.0, 1.0));
        let phase_cell = Arc::new(PhaseCell::new());
        let synth = HapticSynth::with_seed(fs, params.clone(), phase_cell.clone(), 42);
        (synth, params, phase_cell)
    }

    #[test]
    fn silent_when_not_playing() {
        let (mut synth, _params, _cell) = make_synth(48_000.0);
        let mut buf = [0.7f32; 128];
        let frames = synth.render(&mut buf);
        assert_eq!(frames, 64);
        assert!(buf.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sine_matches_oscillator_phase() {
        let fs = 48_000.0;
        let (mut synth, params, _cell) = make_synth(fs);
        params.set_playing(true);
        params.set_amplitude(0.5);

        let mut buf = [0.0f32; 64];
        synth.render(&mut buf);
        let step = TAU * 40.0 / fs;
        for (i, frame) in buf.chunks_exact(2).enumerate() {
            let expected = 0.5 * (i as f32 * step).sin();
            assert!(
                (frame[0] - expected).abs() < 1e-4,
                "i={i} got={} expected={expected}",
                frame[0]
            );
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn phase_export_tracks_render() {
        let (mut synth, params, cell) = make_synth(48_000.0);
        params.set_playing(true);
        let mut buf = [0.0f32; 256];
        synth.render(&mut buf);
        assert_eq!(cell.load(), synth.phase());
        assert!(synth.phase() > 0.0);
    }

    #[test]
    fn phase_is_continuous_across_parameter_changes() {
        let fs = 48_000.0;
        let (mut synth, params, _cell) = make_synth(fs);
        params.set_playing(true);

        let f_max = 120.0;
        let mut buf = [0.0f32; 64];
        let mut prev = synth.phase();
        let changes: [fn(&SharedParams); 4] = [
            |p| p.set_amplitude(0.2),
            |p| p.set_frequency(120.0),
            |p| p.set_signal(SignalType::Snow),
            |p| p.set_velocity(0.8),
        ];
        for change in changes {
            change(&params);
            synth.render(&mut buf);
            let delta = (synth.phase() - prev).rem_euclid(TAU);
            let limit = (buf.len() / 2 + 1) as f32 * max_step(f_max, fs);
            assert!(delta <= limit, "delta={delta} limit={limit}");
            prev = synth.phase();
        }
    }

    #[test]
    fn stereo_gating_and_gains_apply_per_channel() {
        let (mut synth, params, _cell) = make_synth(48_000.0);
        params.set_playing(true);
        params.set_channel_gain(Channel::One, 0.5);
        params.set_channel_enabled(Channel::Two, false);

        let mut gated = [0.0f32; 64];
        synth.render(&mut gated);

        for frame in gated.chunks_exact(2) {
            assert_eq!(frame[1], 0.0, "disabled channel must be silent");
        }

        // Same oscillator, full gain: channel one should be exactly half.
        let params2 = Arc::new(SharedParams::new(40.0, 1.0));
        params2.set_playing(true);
        let mut synth2 = HapticSynth::with_seed(
            48_000.0,
            params2.clone(),
            Arc::new(PhaseCell::new()),
            42,
        );
        let mut full = [0.0f32; 64];
        synth2.render(&mut full);
        for (g, f) in gated.chunks_exact(2).zip(full.chunks_exact(2)) {
            assert!((g[0] - 0.5 * f[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn snow_high_band_gain_contract() {
        let (g_low0, g_mid0, g_high0) = snow_band_gains(0.0);
        assert_eq!(g_high0, 0.0, "high band must vanish at rest");
        assert!((g_low0 - 0.5).abs() < 1e-6);
        assert!((g_mid0 - 0.2).abs() < 1e-6);

        let (g_low1, g_mid1, g_high1) = snow_band_gains(1.0);
        assert!((g_high1 - 0.4).abs() < 1e-6);
        assert!((g_low1 - 0.8).abs() < 1e-6);
        assert!((g_mid1 - 0.7).abs() < 1e-6);
    }

    #[test]
    fn reset_returns_phase_to_zero() {
        let (mut synth, params, cell) = make_synth(48_000.0);
        params.set_playing(true);
        let mut buf = [0.0f32; 32];
        synth.render(&mut buf);
        assert!(synth.phase() != 0.0);
        synth.reset();
        assert_eq!(synth.phase(), 0.0);
        assert_eq!(cell.load(), 0.0);
    }
}
