//! Zero-offset calibration: averages the standing CoP and weight over a
//! short accumulation window and latches them as subtractive offsets.

use tracing::debug;

/// Samples collected by a full calibration pass (3 s at the nominal 60 Hz).
pub const CALIBRATION_SAMPLES: usize = 180;

/// Fewer accepted samples than this on completion fails the pass.
pub const MIN_ACCEPTED_SAMPLES: usize = 10;

/// Latched values from a completed calibration pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOutcome {
    pub offset_x: f32,
    pub offset_y: f32,
    pub tare_kg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Accumulating,
}

/// Calibration offsets plus the accumulator that produces them.
///
/// The state machine is `Idle -> Accumulating -> Idle`. While accumulating,
/// every sensor sample advances the elapsed counter, but only samples above
/// the weight threshold enter the sums; a pass that ends with fewer than
/// [`MIN_ACCEPTED_SAMPLES`] accepted samples fails and leaves previously
/// latched values untouched.
#[derive(Debug)]
pub struct CalibrationState {
    offset_x: f32,
    offset_y: f32,
    tare_kg: f32,
    calibrated: bool,
    phase: Phase,
    target: usize,
    min_accepted: usize,
    elapsed: usize,
    accepted: usize,
    sum_x: f64,
    sum_y: f64,
    sum_w: f64,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::with_target(CALIBRATION_SAMPLES)
    }

    pub fn with_target(target: usize) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            tare_kg: 0.0,
            calibrated: false,
            phase: Phase::Idle,
            target: target.max(1),
            min_accepted: MIN_ACCEPTED_SAMPLES.min(target.max(1)),
            elapsed: 0,
            accepted: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_w: 0.0,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn in_progress(&self) -> bool {
        self.phase == Phase::Accumulating
    }

    /// Accumulation progress as (elapsed, target).
    pub fn progress(&self) -> (usize, usize) {
        (self.elapsed, self.target)
    }

    pub fn offsets(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }

    pub fn tare_kg(&self) -> f32 {
        self.tare_kg
    }

    /// Begin accumulating. Honored only from `Idle`; returns whether a new
    /// pass actually started.
    pub fn start(&mut self) -> bool {
        if self.phase == Phase::Accumulating {
            return false;
        }
        self.phase = Phase::Accumulating;
        self.elapsed = 0;
        self.accepted = 0;
        self.sum_x = 0.0;
        self.sum_y = 0.0;
        self.sum_w = 0.0;
        debug!(samples = self.target, "calibration started");
        true
    }

    /// Discard the accumulator without touching latched values.
    pub fn cancel(&mut self) {
        if self.phase == Phase::Accumulating {
            debug!(elapsed = self.elapsed, "calibration cancelled");
        }
        self.phase = Phase::Idle;
        self.elapsed = 0;
        self.accepted = 0;
        self.sum_x = 0.0;
        self.sum_y = 0.0;
        self.sum_w = 0.0;
    }

    /// Clear latched offsets and tare, and any pass in flight.
    pub fn reset(&mut self) {
        self.cancel();
        self.offset_x = 0.0;
        self.offset_y = 0.0;
        self.tare_kg = 0.0;
        self.calibrated = false;
    }

    /// Feed one sensor tick. `accepted_sample` carries the raw CoP and
    /// total weight when the sample passed the weight gate, `None`
    /// otherwise (the tick still counts toward completion).
    ///
    /// Returns `Some(Ok(outcome))` when a pass completes and latches,
    /// `Some(Err(accepted))` when it completes short of the minimum, and
    /// `None` while still accumulating (or idle).
    pub fn feed(
        &mut self,
        accepted_sample: Option<(f32, f32, f32)>,
    ) -> Option<Result<CalibrationOutcome, usize>> {
        if self.phase != Phase::Accumulating {
            return None;
        }
        if let Some((x, y, weight)) = accepted_sample {
            self.sum_x += x as f64;
            self.sum_y += y as f64;
            self.sum_w += weight as f64;
            self.accepted += 1;
        }
        self.elapsed += 1;
        if self.elapsed < self.target {
            return None;
        }

        self.phase = Phase::Idle;
        let accepted = self.accepted;
        if accepted < self.min_accepted {
            debug!(accepted, "calibration failed: too few accepted samples");
            return Some(Err(accepted));
        }

        let n = accepted as f64;
        let outcome = CalibrationOutcome {
            offset_x: (self.sum_x / n) as f32,
            offset_y: (self.sum_y / n) as f32,
            tare_kg: (self.sum_w / n) as f32,
        };
        self.offset_x = outcome.offset_x;
        self.offset_y = outcome.offset_y;
        self.tare_kg = outcome.tare_kg;
        self.calibrated = true;
        debug!(
            offset_x = outcome.offset_x,
            offset_y = outcome.offset_y,
            tare_kg = outcome.tare_kg,
            "calibration latched"
        );
        Some(Ok(outcome))
    }
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self::new()
    }
}
