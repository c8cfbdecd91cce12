//! Output protection for the demo paths. The narrow resonators in the
//! noise textures have large gain, so everything headed to a device or a
//! file passes through a guard stage first.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutputGuardMode {
    None,
    /// tanh soft clip toward the ceiling.
    SoftClip { ceiling: f32, drive: f32 },
    /// Instant-attack peak limiter with smoothed release.
    Limiter { ceiling: f32, release_ms: f32 },
}

impl Default for OutputGuardMode {
    fn default() -> Self {
        Self::Limiter {
            ceiling: 0.98,
            release_ms: 50.0,
        }
    }
}

#[derive(Debug)]
pub struct OutputGuard {
    mode: OutputGuardMode,
    gain: f32,
    release_coeff: f32,
}

impl OutputGuard {
    pub fn new(mode: OutputGuardMode, sample_rate: u32) -> Self {
        let release_coeff = match mode {
            OutputGuardMode::Limiter { release_ms, .. } => {
                time_to_coeff(release_ms, sample_rate as f32)
            }
            _ => 0.0,
        };
        Self {
            mode,
            gain: 1.0,
            release_coeff,
        }
    }

    /// Process interleaved frames in place, channel-linked.
    pub fn process_interleaved(&mut self, frames: &mut [f32], channels: usize) {
        if frames.is_empty() || channels == 0 {
            return;
        }
        match self.mode {
            OutputGuardMode::None => {}
            OutputGuardMode::SoftClip { ceiling, drive } => {
                let ceiling = ceiling.abs().max(1e-6);
                let drive = drive.max(0.0);
                for s in frames.iter_mut() {
                    let x = if s.is_finite() { *s } else { 0.0 };
                    *s = (x * drive).tanh() * ceiling;
                }
            }
            OutputGuardMode::Limiter { ceiling, .. } => {
                let ceiling = ceiling.abs().max(1e-6);
                for frame in frames.chunks_mut(channels) {
                    let mut peak = 0.0f32;
                    for s in frame.iter() {
                        let a = if s.is_finite() { s.abs() } else { 0.0 };
                        peak = peak.max(a);
                    }
                    let target = if peak > ceiling { ceiling / peak } else { 1.0 };
                    self.gain = if target < self.gain {
                        target
                    } else {
                        self.release_coeff * self.gain + (1.0 - self.release_coeff) * target
                    };
                    for s in frame.iter_mut() {
                        let x = if s.is_finite() { *s } else { 0.0 };
                        *s = (x * self.gain).clamp(-ceiling, ceiling);
                    }
                }
            }
        }
    }
}

fn time_to_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let time_s = time_ms.max(0.0) * 0.001;
    if time_s <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_s * sample_rate)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_holds_the_ceiling() {
        let mut guard = OutputGuard::new(OutputGuardMode::default(), 48_000);
        let mut buf = [0.0f32, 2.0, -3.0, 0.25, 40.0, -0.5];
        guard.process_interleaved(&mut buf, 2);
        for &v in &buf {
            assert!(v.abs() <= 0.98 + 1e-6, "{v} exceeds ceiling");
        }
    }

    #[test]
    fn soft_clip_holds_the_ceiling() {
        let mut guard = OutputGuard::new(
            OutputGuardMode::SoftClip {
                ceiling: 0.9,
                drive: 2.0,
            },
            48_000,
        );
        let mut buf = [1.5f32, -1.5, 0.4, 0.0];
        guard.process_interleaved(&mut buf, 2);
        for &v in &buf {
            assert!(v.abs() <= 0.9 + 1e-6, "{v}");
        }
    }

    #[test]
    fn none_is_transparent() {
        let mut guard = OutputGuard::new(OutputGuardMode::None, 48_000);
        let mut buf = [0.25f32, -0.5, 0.1, 0.0];
        let original = buf;
        guard.process_interleaved(&mut buf, 2);
        assert_eq!(buf, original);
    }

    #[test]
    fn quiet_signal_passes_the_limiter_unchanged() {
        let mut guard = OutputGuard::new(OutputGuardMode::default(), 48_000);
        let mut buf = [0.25f32, -0.5, 0.1, 0.0];
        let original = buf;
        guard.process_interleaved(&mut buf, 2);
        for (a, b) in buf.iter().zip(original.iter()) {
            assert!((a - b).abs() <= 1e-6);
        }
    }

    #[test]
    fn non_finite_input_is_silenced() {
        let mut guard = OutputGuard::new(OutputGuardMode::default(), 48_000);
        let mut buf = [f32::NAN, f32::INFINITY];
        guard.process_interleaved(&mut buf, 2);
        assert_eq!(buf, [0.0, 0.0]);
    }
}
