//! Sensor-domain pipeline: estimator into canceller, phase-locked to the
//! synthesizer through the shared phase cell.

use std::sync::Arc;

use crate::cancel::{Axis, CancelConfig, Canceller, MetricsSnapshot};
use crate::haptic::{PhaseCell, SharedParams};
use crate::plate::{CopEstimator, CopSample, PlateGeometry, SensorFrame};

/// One object per balance plate, owned by whichever thread runs the
/// sensor callback. Each incoming frame makes exactly one pass: raw CoP,
/// calibration offsets, then interference cancellation against the phase
/// the audio thread last published.
pub struct BalancePipeline {
    estimator: CopEstimator,
    canceller: Canceller,
    phase: Arc<PhaseCell>,
    params: Arc<SharedParams>,
}

impl BalancePipeline {
    pub fn new(
        geometry: PlateGeometry,
        cancel_cfg: CancelConfig,
        phase: Arc<PhaseCell>,
        params: Arc<SharedParams>,
    ) -> Self {
        Self {
            estimator: CopEstimator::new(geometry),
            canceller: Canceller::new(cancel_cfg),
            phase,
            params,
        }
    }

    /// One call per sensor sample. Invalid readings (weight below the
    /// gate) skip the canceller entirely; they carry no position.
    pub fn process(&mut self, frame: SensorFrame) -> CopSample {
        let mut sample = self.estimator.process(frame);
        if !sample.valid {
            return sample;
        }
        let (x, y) = self.canceller.process(
            sample.x,
            sample.y,
            Some(self.phase.load()),
            self.params.is_playing(),
        );
        sample.x = x;
        sample.y = y;
        sample
    }

    // --- calibration control ---

    pub fn start_calibration(&mut self) -> bool {
        self.estimator.start_calibration()
    }

    pub fn cancel_calibration(&mut self) {
        self.estimator.cancel_calibration();
    }

    pub fn reset_calibration(&mut self) {
        self.estimator.reset_calibration();
    }

    pub fn estimator(&self) -> &CopEstimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut CopEstimator {
        &mut self.estimator
    }

    // --- compensation control ---

    pub fn set_compensation_enabled(&mut self, enabled: bool) {
        self.canceller.set_enabled(enabled);
    }

    pub fn set_compensation_notch(&mut self, use_notch: bool) {
        self.canceller.set_use_notch(use_notch);
    }

    pub fn set_compensation_step(&mut self, step_size: f32) {
        self.canceller.set_step_size(step_size);
    }

    pub fn set_compensation_frequency(&mut self, frequency_hz: f32) {
        self.canceller.set_frequency(frequency_hz);
    }

    pub fn reset_compensation(&mut self) {
        self.canceller.reset();
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.canceller.metrics()
    }

    pub fn harmonic_amplitude(&self, axis: Axis, k: usize) -> f32 {
        self.canceller.harmonic_amplitude(axis, k)
    }

    pub fn canceller(&self) -> &Canceller {
        &self.canceller
    }

    pub fn canceller_mut(&mut self) -> &mut Canceller {
        &mut self.canceller
    }
}
