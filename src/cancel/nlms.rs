//! Multi-harmonic normalized-LMS adapter, one weight pair per harmonic
//! per axis.

/// Upper bound on the harmonic count; weight arrays are sized for it so
/// changing the active count never touches the sample path.
pub const MAX_HARMONICS: usize = 8;

/// Hard clip on every adaptive weight, in mm.
pub const WEIGHT_LIMIT: f32 = 100.0;

/// Regularizer added to the reference power before normalizing the step.
pub const NORM_EPS: f32 = 1e-6;

/// Step-size bounds, (0.001, 1.9].
pub const STEP_MIN: f32 = 0.001;
pub const STEP_MAX: f32 = 1.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Adaptive estimate of the drive interference on both CoP axes.
///
/// The reference vector is `[sin φ, cos φ, sin 2φ, cos 2φ, ...]` built
/// from the oscillator phase; adaptation runs on the corrected signal,
/// which is the standard noise-canceller arrangement and is unbiased as
/// long as the true CoP is uncorrelated with the reference sinusoids.
#[derive(Debug, Clone)]
pub struct HarmonicNlms {
    harmonics: usize,
    step_size: f32,
    w_x: [f32; 2 * MAX_HARMONICS],
    w_y: [f32; 2 * MAX_HARMONICS],
    reference: [f32; 2 * MAX_HARMONICS],
}

impl HarmonicNlms {
    pub fn new(harmonics: usize, step_size: f32) -> Self {
        Self {
            harmonics: harmonics.clamp(1, MAX_HARMONICS),
            step_size: step_size.clamp(STEP_MIN, STEP_MAX),
            w_x: [0.0; 2 * MAX_HARMONICS],
            w_y: [0.0; 2 * MAX_HARMONICS],
            reference: [0.0; 2 * MAX_HARMONICS],
        }
    }

    pub fn harmonics(&self) -> usize {
        self.harmonics
    }

    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    pub fn set_step_size(&mut self, step_size: f32) {
        self.step_size = step_size.clamp(STEP_MIN, STEP_MAX);
    }

    /// Subtract the current interference estimate; adapt when `learn`.
    /// Returns the corrected pair.
    pub fn process(&mut self, x: f32, y: f32, phase: f32, learn: bool) -> (f32, f32) {
        let n = 2 * self.harmonics;
        for k in 0..self.harmonics {
            let (s, c) = ((k + 1) as f32 * phase).sin_cos();
            self.reference[2 * k] = s;
            self.reference[2 * k + 1] = c;
        }

        let mut est_x = 0.0;
        let mut est_y = 0.0;
        for i in 0..n {
            est_x += self.w_x[i] * self.reference[i];
            est_y += self.w_y[i] * self.reference[i];
        }
        let e_x = x - est_x;
        let e_y = y - est_y;

        if learn {
            let mut power = 0.0;
            for i in 0..n {
                power += self.reference[i] * self.reference[i];
            }
            let step = self.step_size / (power + NORM_EPS);
            for i in 0..n {
                let r = self.reference[i];
                self.w_x[i] =
                    (self.w_x[i] + step * e_x * r).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
                self.w_y[i] =
                    (self.w_y[i] + step * e_y * r).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
            }
        }

        (e_x, e_y)
    }

    /// Magnitude of the learned component at harmonic `k` (0-based).
    pub fn harmonic_amplitude(&self, axis: Axis, k: usize) -> f32 {
        if k >= self.harmonics {
            return 0.0;
        }
        let w = match axis {
            Axis::X => &self.w_x,
            Axis::Y => &self.w_y,
        };
        (w[2 * k] * w[2 * k] + w[2 * k + 1] * w[2 * k + 1]).sqrt()
    }

    pub fn weights(&self, axis: Axis) -> &[f32] {
        let w = match axis {
            Axis::X => &self.w_x,
            Axis::Y => &self.w_y,
        };
        &w[..2 * self.harmonics]
    }

    pub fn reset(&mut self) {
        self.w_x = [0.0; 2 * MAX_HARMONICS];
        self.w_y = [0.0; 2 * MAX_HARMONICS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn learns_a_pure_tone() {
        let fs = 60.0;
        let freq = 17.0;
        let mut nlms = HarmonicNlms::new(1, 0.5);
        let mut last = 0.0;
        for n in 0..600 {
            let phase = (TAU * freq * n as f32 / fs).rem_euclid(TAU);
            let contaminated = 4.0 * (phase + 0.9).sin();
            let (e, _) = nlms.process(contaminated, 0.0, phase, true);
            last = e;
        }
        assert!(last.abs() < 0.05, "residual={last}");
        assert!(
            (nlms.harmonic_amplitude(Axis::X, 0) - 4.0).abs() < 0.1,
            "amplitude estimate off"
        );
    }

    #[test]
    fn weights_never_exceed_the_clip() {
        let mut nlms = HarmonicNlms::new(3, STEP_MAX);
        for n in 0..2000 {
            let phase = (0.3 * n as f32).rem_euclid(TAU);
            // Deliberately hostile input amplitudes.
            let x = 1.0e4 * (0.11 * n as f32).sin();
            let y = -1.0e4 * (0.07 * n as f32).cos();
            nlms.process(x, y, phase, true);
            for &w in nlms.weights(Axis::X).iter().chain(nlms.weights(Axis::Y)) {
                assert!(w.abs() <= WEIGHT_LIMIT, "w={w}");
            }
        }
    }

    #[test]
    fn frozen_weights_do_not_adapt() {
        let mut nlms = HarmonicNlms::new(2, 0.5);
        let before: Vec<f32> = nlms.weights(Axis::X).to_vec();
        nlms.process(10.0, -3.0, 1.2, false);
        assert_eq!(before, nlms.weights(Axis::X).to_vec());
    }

    #[test]
    fn step_size_is_clamped() {
        let mut nlms = HarmonicNlms::new(3, 5.0);
        assert_eq!(nlms.step_size(), STEP_MAX);
        nlms.set_step_size(0.0);
        assert_eq!(nlms.step_size(), STEP_MIN);
    }

    #[test]
    fn harmonic_count_is_bounded() {
        let nlms = HarmonicNlms::new(0, 0.5);
        assert_eq!(nlms.harmonics(), 1);
        let nlms = HarmonicNlms::new(64, 0.5);
        assert_eq!(nlms.harmonics(), MAX_HARMONICS);
    }
}
