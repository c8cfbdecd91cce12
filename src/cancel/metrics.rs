//! Running quality metrics for the canceller: smoothed input/error power,
//! the SNR-improvement estimate, and window-based convergence detection.

use crate::core::db::power_to_db;
use crate::core::window::StatsWindow;

/// EWMA factor for input power.
pub const POWER_SMOOTHING: f32 = 0.99;

/// EWMA factor for error power.
pub const ERROR_SMOOTHING: f32 = 0.95;

/// Samples in the squared-error window used for convergence detection.
pub const MSE_WINDOW: usize = 60;

const SNR_EPS: f32 = 1e-6;

/// Copyable view of the metrics for display threads; staleness is fine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub snr_improvement_estimate: f32,
    pub input_power: f32,
    pub error_power: f32,
    pub converged: bool,
    pub samples: u64,
}

/// Exponentially weighted power estimates plus a fixed window over the
/// per-sample squared error.
///
/// The exported ratio is labelled an *estimate*: it compares smoothed
/// input power against what remains after correction, which lower-bounds
/// a classical SNR but tracks cancellation quality well.
#[derive(Debug, Clone)]
pub struct QualityMetrics {
    input_power: f32,
    error_power: f32,
    window: StatsWindow,
    samples: u64,
    converged: bool,
    variance_threshold: f32,
    mean_threshold: f32,
}

impl QualityMetrics {
    pub fn new(variance_threshold: f32, mean_threshold: f32) -> Self {
        Self {
            input_power: 0.0,
            error_power: 0.0,
            window: StatsWindow::new(MSE_WINDOW),
            samples: 0,
            converged: false,
            variance_threshold,
            mean_threshold,
        }
    }

    /// Fold in one sample pair (input and corrected). Returns true on the
    /// unconverged-to-converged transition, which happens at most once per
    /// reset.
    pub fn update(&mut self, x: f32, y: f32, e_x: f32, e_y: f32) -> bool {
        let input_sq = x * x + y * y;
        let error_sq = e_x * e_x + e_y * e_y;

        self.input_power =
            POWER_SMOOTHING * self.input_power + (1.0 - POWER_SMOOTHING) * input_sq;
        self.error_power =
            ERROR_SMOOTHING * self.error_power + (1.0 - ERROR_SMOOTHING) * error_sq;
        self.window.push(error_sq);
        self.samples += 1;

        if self.converged || !self.window.is_full() {
            return false;
        }
        if self.window.variance() < self.variance_threshold
            && self.window.mean() < self.mean_threshold
        {
            self.converged = true;
            return true;
        }
        false
    }

    /// dB ratio of smoothed input power to residual power; an estimate
    /// that lower-bounds a classical SNR.
    pub fn snr_improvement_estimate(&self) -> f32 {
        let ratio = (self.input_power + SNR_EPS) / (self.error_power + SNR_EPS);
        power_to_db(ratio)
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            snr_improvement_estimate: self.snr_improvement_estimate(),
            input_power: self.input_power,
            error_power: self.error_power,
            converged: self.converged,
            samples: self.samples,
        }
    }

    pub fn reset(&mut self) {
        self.input_power = 0.0;
        self.error_power = 0.0;
        self.window.clear();
        self.samples = 0;
        self.converged = false;
    }
}
