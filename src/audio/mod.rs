//! Host-side audio plumbing: device output, output protection, WAV capture.

pub mod guard;
pub mod output;
pub mod writer;

pub use guard::{OutputGuard, OutputGuardMode};
pub use output::AudioOutput;
pub use writer::WavOutput;
