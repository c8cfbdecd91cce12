//! Load-cell to center-of-pressure conversion.

use crate::plate::calibration::{CalibrationOutcome, CalibrationState};
use crate::plate::{CopSample, SensorFrame};

/// Physical span of the sensing area in millimeters and the weight gate
/// below which a reading carries no usable position information.
#[derive(Debug, Clone, Copy)]
pub struct PlateGeometry {
    /// Y span (front-to-back), mm.
    pub length_mm: f32,
    /// X span (left-to-right), mm.
    pub width_mm: f32,
    /// Total weight below this is reported as invalid, kg.
    pub min_weight_kg: f32,
}

impl Default for PlateGeometry {
    fn default() -> Self {
        Self {
            length_mm: 433.0,
            width_mm: 238.0,
            min_weight_kg: 5.0,
        }
    }
}

/// Raw estimate: weighted cell difference over the total, scaled to the
/// half-spans. One division, no allocation, deterministic.
pub fn compute_cop(geometry: &PlateGeometry, frame: &SensorFrame) -> (f32, f32, f32, bool) {
    let total = frame.total();
    if total < geometry.min_weight_kg {
        return (0.0, 0.0, total, false);
    }
    let inv = 1.0 / total;
    let x = 0.5 * geometry.width_mm * ((frame.tr + frame.br) - (frame.tl + frame.bl)) * inv;
    let y = 0.5 * geometry.length_mm * ((frame.tl + frame.tr) - (frame.bl + frame.br)) * inv;
    (x, y, total, true)
}

type CompleteCallback = Box<dyn FnMut(CalibrationOutcome) + Send>;
type FailedCallback = Box<dyn FnMut(usize) + Send>;

/// Stateful estimator: raw conversion plus the calibration pass and the
/// latched offsets it produces.
///
/// Calibration never stalls the output: while a pass accumulates, samples
/// flow through with whatever offsets were latched before.
pub struct CopEstimator {
    geometry: PlateGeometry,
    calibration: CalibrationState,
    on_calibration_complete: Option<CompleteCallback>,
    on_calibration_failed: Option<FailedCallback>,
}

impl CopEstimator {
    pub fn new(geometry: PlateGeometry) -> Self {
        Self {
            geometry,
            calibration: CalibrationState::new(),
            on_calibration_complete: None,
            on_calibration_failed: None,
        }
    }

    pub fn geometry(&self) -> &PlateGeometry {
        &self.geometry
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    /// Invoked once per completed calibration pass, from the sensor thread.
    pub fn set_on_calibration_complete(&mut self, cb: CompleteCallback) {
        self.on_calibration_complete = Some(cb);
    }

    /// Invoked once per failed calibration pass, with the accepted count.
    pub fn set_on_calibration_failed(&mut self, cb: FailedCallback) {
        self.on_calibration_failed = Some(cb);
    }

    pub fn start_calibration(&mut self) -> bool {
        self.calibration.start()
    }

    pub fn cancel_calibration(&mut self) {
        self.calibration.cancel();
    }

    pub fn reset_calibration(&mut self) {
        self.calibration.reset();
    }

    /// Convert one sensor frame. Below the weight gate the sample is
    /// flagged invalid with zeroed coordinates; that is a reading, not an
    /// error.
    pub fn process(&mut self, frame: SensorFrame) -> CopSample {
        let (raw_x, raw_y, total, valid) = compute_cop(&self.geometry, &frame);

        // Snapshot before feeding the accumulator: values latched by this
        // very sample take effect starting with the next one.
        let (offset_x, offset_y) = self.calibration.offsets();
        let tare_kg = self.calibration.tare_kg();

        if self.calibration.in_progress() {
            let accepted = valid.then_some((raw_x, raw_y, total));
            match self.calibration.feed(accepted) {
                Some(Ok(outcome)) => {
                    if let Some(cb) = self.on_calibration_complete.as_mut() {
                        cb(outcome);
                    }
                }
                Some(Err(accepted)) => {
                    if let Some(cb) = self.on_calibration_failed.as_mut() {
                        cb(accepted);
                    }
                }
                None => {}
            }
        }

        if !valid {
            return CopSample::invalid(total, frame.timestamp_ms);
        }

        CopSample {
            x: raw_x - offset_x,
            y: raw_y - offset_y,
            raw_x,
            raw_y,
            weight_kg: total - tare_kg,
            valid: true,
            timestamp_ms: frame.timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tl: f32, tr: f32, bl: f32, br: f32) -> SensorFrame {
        SensorFrame {
            tl,
            tr,
            bl,
            br,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn symmetric_load_is_centered() {
        let geom = PlateGeometry::default();
        for w in [2.0, 10.0, 25.0, 80.0] {
            let (x, y, total, valid) = compute_cop(&geom, &frame(w, w, w, w));
            assert_eq!((x, y), (0.0, 0.0), "w={w}");
            assert_eq!(total, 4.0 * w);
            assert_eq!(valid, total >= geom.min_weight_kg);
        }
    }

    #[test]
    fn below_weight_gate_is_invalid_and_zeroed() {
        let geom = PlateGeometry::default();
        let (x, y, total, valid) = compute_cop(&geom, &frame(1.0, 1.0, 1.0, 1.5));
        assert!(!valid);
        assert_eq!((x, y), (0.0, 0.0));
        assert!((total - 4.5).abs() < 1e-6);
    }

    #[test]
    fn extreme_corner_loads_stay_within_half_spans() {
        let geom = PlateGeometry::default();
        let corners = [
            frame(100.0, 0.0, 0.0, 0.0),
            frame(0.0, 100.0, 0.0, 0.0),
            frame(0.0, 0.0, 100.0, 0.0),
            frame(0.0, 0.0, 0.0, 100.0),
            frame(60.0, 0.1, 0.1, 0.1),
        ];
        for f in corners {
            let (x, y, _, valid) = compute_cop(&geom, &f);
            assert!(valid);
            assert!(x.abs() <= geom.width_mm / 2.0, "x={x}");
            assert!(y.abs() <= geom.length_mm / 2.0, "y={y}");
        }
    }

    #[test]
    fn forward_lean_moves_y_positive() {
        let geom = PlateGeometry::default();
        let (x, y, _, valid) = compute_cop(&geom, &frame(20.0, 20.0, 10.0, 10.0));
        assert!(valid);
        assert!(x.abs() < 1e-4);
        let expected = 0.5 * geom.length_mm * (40.0 - 20.0) / 60.0;
        assert!((y - expected).abs() < 1e-3, "y={y} expected={expected}");
    }

    #[test]
    fn offsets_apply_only_after_completion() {
        let mut est = CopEstimator::new(PlateGeometry::default());
        // Stand slightly right of center for the whole pass.
        let standing = frame(10.0, 20.0, 10.0, 20.0);
        let (raw_x, _, _, _) = compute_cop(est.geometry(), &standing);

        est.start_calibration();
        let (_, target) = est.calibration().progress();
        for _ in 0..target - 1 {
            let s = est.process(standing);
            assert!((s.x - raw_x).abs() < 1e-6, "pass must not stall output");
        }
        let s = est.process(standing);
        assert!((s.x - raw_x).abs() < 1e-6, "completion sample still raw");

        let s = est.process(standing);
        assert!(s.x.abs() < 1e-4, "offset applies from the next sample");
        assert!(s.weight_kg.abs() < 1e-3, "tare zeroes the standing weight");
        assert!((s.raw_x - raw_x).abs() < 1e-6, "raw copy stays uncalibrated");
    }

    #[test]
    fn failed_pass_fires_callback_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut est = CopEstimator::new(PlateGeometry::default());
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        est.set_on_calibration_failed(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        est.start_calibration();
        let (_, target) = est.calibration().progress();
        for _ in 0..target + 5 {
            est.process(frame(0.0, 0.0, 0.0, 0.0));
        }
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(!est.calibration().is_calibrated());
    }
}
