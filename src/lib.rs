//! Balance-plate center-of-pressure sensing with adaptive cancellation of
//! haptic-drive interference.
//!
//! Three subsystems share one timing invariant: the haptic synthesizer's
//! sine-oscillator phase is the reference input of the interference
//! canceller, so audio rendering, phase export, and CoP correction stay
//! sample-accurate relative to one another.
//!
//! - [`plate`] converts four load-cell readings into a center of pressure
//!   and runs the zero-offset calibration routine.
//! - [`cancel`] removes the haptic drive frequency and its harmonics from
//!   the CoP stream (normalized LMS, with an IIR notch fallback).
//! - [`haptic`] renders the drive signal itself (sine, band-limited noise,
//!   or the three-band snow texture) and publishes its phase.

pub mod audio;
pub mod cancel;
pub mod config;
pub mod core;
pub mod haptic;
pub mod pipeline;
pub mod plate;
pub mod sim;

pub use pipeline::BalancePipeline;
