//! Adaptive multi-harmonic interference cancellation for the CoP stream.
//!
//! The canceller subtracts the haptic drive frequency and its first few
//! harmonics from the (x, y) position, phase-locked to the synthesizer's
//! oscillator. A fixed IIR notch is available as a non-adaptive fallback
//! for sessions too short for the filter to learn.

pub mod metrics;
pub mod nlms;
pub mod notch;

pub use metrics::{MetricsSnapshot, QualityMetrics};
pub use nlms::{Axis, HarmonicNlms, MAX_HARMONICS};
pub use notch::NotchFilter;

use crate::core::phase::advance;

type ConvergedCallback = Box<dyn FnMut(f32) + Send>;

/// Construction-time knobs; step size and frequency stay adjustable at
/// runtime through the control surface.
#[derive(Debug, Clone, Copy)]
pub struct CancelConfig {
    /// Sensor callback rate, Hz.
    pub sensor_rate_hz: f32,
    /// Haptic drive fundamental, Hz.
    pub frequency_hz: f32,
    /// Harmonics tracked by the adaptive backend (1..=8).
    pub harmonics: usize,
    /// NLMS step size μ.
    pub step_size: f32,
    /// Squared-error window variance below this counts as settled, mm².
    pub variance_threshold: f32,
    /// Squared-error window mean below this counts as settled, mm².
    pub mean_threshold: f32,
}

impl Default for CancelConfig {
    fn default() -> Self {
        Self {
            sensor_rate_hz: 60.0,
            frequency_hz: 40.0,
            harmonics: 3,
            step_size: 0.5,
            variance_threshold: 0.01,
            mean_threshold: 1.0,
        }
    }
}

/// Sensor-domain interference canceller with two selectable backends.
///
/// Pass-through rules: when compensation is disabled or the haptic is not
/// active, the input flows out bit-exact and nothing adapts. The internal
/// phase accumulator (used only without an external phase) resets on
/// inactivity so re-engagement starts from a known state.
pub struct Canceller {
    sensor_rate_hz: f32,
    frequency_hz: f32,
    enabled: bool,
    use_notch: bool,
    nlms: HarmonicNlms,
    notch_x: NotchFilter,
    notch_y: NotchFilter,
    metrics: QualityMetrics,
    internal_phase: f32,
    on_converged: Option<ConvergedCallback>,
}

impl Canceller {
    pub fn new(cfg: CancelConfig) -> Self {
        Self {
            sensor_rate_hz: cfg.sensor_rate_hz,
            frequency_hz: cfg.frequency_hz,
            enabled: true,
            use_notch: false,
            nlms: HarmonicNlms::new(cfg.harmonics, cfg.step_size),
            notch_x: NotchFilter::new(cfg.frequency_hz, cfg.sensor_rate_hz),
            notch_y: NotchFilter::new(cfg.frequency_hz, cfg.sensor_rate_hz),
            metrics: QualityMetrics::new(cfg.variance_threshold, cfg.mean_threshold),
            internal_phase: 0.0,
            on_converged: None,
        }
    }

    /// Invoked with the current SNR estimate on the single
    /// unconverged-to-converged transition, from the sensor thread.
    pub fn set_on_converged(&mut self, cb: ConvergedCallback) {
        self.on_converged = Some(cb);
    }

    /// Correct one CoP sample. `external_phase` is the synthesizer's
    /// exported oscillator phase; a negative value (or `None`) falls back
    /// to internal integration at the configured frequency.
    pub fn process(
        &mut self,
        x: f32,
        y: f32,
        external_phase: Option<f32>,
        haptic_active: bool,
    ) -> (f32, f32) {
        if !haptic_active {
            self.internal_phase = 0.0;
            return (x, y);
        }
        if !self.enabled {
            return (x, y);
        }

        let phase = match external_phase {
            Some(p) if p >= 0.0 => p,
            _ => {
                let p = self.internal_phase;
                self.internal_phase = advance(p, self.frequency_hz, self.sensor_rate_hz);
                p
            }
        };

        let (e_x, e_y) = if self.use_notch {
            (self.notch_x.process(x), self.notch_y.process(y))
        } else {
            self.nlms.process(x, y, phase, true)
        };

        if self.metrics.update(x, y, e_x, e_y) {
            let snr = self.metrics.snr_improvement_estimate();
            if let Some(cb) = self.on_converged.as_mut() {
                cb(snr);
            }
        }

        (e_x, e_y)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Select the notch backend instead of NLMS.
    pub fn set_use_notch(&mut self, use_notch: bool) {
        self.use_notch = use_notch;
    }

    pub fn uses_notch(&self) -> bool {
        self.use_notch
    }

    pub fn set_step_size(&mut self, step_size: f32) {
        self.nlms.set_step_size(step_size);
    }

    pub fn step_size(&self) -> f32 {
        self.nlms.step_size()
    }

    /// Retarget both backends; the notch state is zeroed along with the
    /// coefficient change.
    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency_hz = frequency_hz.max(0.1);
        self.notch_x.set_frequency(self.frequency_hz, self.sensor_rate_hz);
        self.notch_y.set_frequency(self.frequency_hz, self.sensor_rate_hz);
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn harmonic_amplitude(&self, axis: Axis, k: usize) -> f32 {
        self.nlms.harmonic_amplitude(axis, k)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn converged(&self) -> bool {
        self.metrics.converged()
    }

    /// Zero weights, metrics, the internal phase, and the notch delay
    /// lines. The converged flag drops back to false.
    pub fn reset(&mut self) {
        self.nlms.reset();
        self.notch_x.reset();
        self.notch_y.reset();
        self.metrics.reset();
        self.internal_phase = 0.0;
    }
}
