use vibrastance::plate::{compute_cop, CopEstimator, PlateGeometry, SensorFrame};

fn frame(tl: f32, tr: f32, bl: f32, br: f32, n: u64) -> SensorFrame {
    SensorFrame {
        tl,
        tr,
        bl,
        br,
        timestamp_ms: n * 16,
    }
}

#[test]
fn symmetric_loads_are_exactly_centered() {
    let geom = PlateGeometry::default();
    for w in [1.5, 5.0, 17.25, 40.0, 123.456] {
        let (x, y, _, valid) = compute_cop(&geom, &frame(w, w, w, w, 0));
        assert_eq!((x, y), (0.0, 0.0), "w={w}");
        assert_eq!(valid, 4.0 * w >= geom.min_weight_kg);
    }
}

#[test]
fn every_valid_output_stays_within_the_half_spans() {
    let geom = PlateGeometry::default();
    // Sweep strongly asymmetric loads, including near-zero cells.
    let levels = [0.0f32, 0.01, 2.0, 30.0, 95.0];
    for &tl in &levels {
        for &tr in &levels {
            for &bl in &levels {
                for &br in &levels {
                    let (x, y, total, valid) = compute_cop(&geom, &frame(tl, tr, bl, br, 0));
                    if !valid {
                        assert!(total < geom.min_weight_kg);
                        continue;
                    }
                    assert!(x.abs() <= geom.width_mm / 2.0 + 1e-3, "x={x}");
                    assert!(y.abs() <= geom.length_mm / 2.0 + 1e-3, "y={y}");
                }
            }
        }
    }
}

#[test]
fn below_threshold_reads_as_invalid_origin() {
    let geom = PlateGeometry::default();
    let cases = [
        frame(0.0, 0.0, 0.0, 0.0, 0),
        frame(1.0, 1.0, 1.0, 1.9, 0),
        frame(4.9, 0.0, 0.0, 0.0, 0),
    ];
    for f in cases {
        let (x, y, _, valid) = compute_cop(&geom, &f);
        assert!(!valid);
        assert_eq!((x, y), (0.0, 0.0));
    }
}

#[test]
fn estimator_is_deterministic() {
    let mut est = CopEstimator::new(PlateGeometry::default());
    let f = frame(12.0, 17.5, 9.25, 21.0, 3);
    let a = est.process(f);
    let b = est.process(f);
    assert_eq!(a, b);
}

// Empty board, then someone steps on.
#[test]
fn step_on_transition() {
    let mut est = CopEstimator::new(PlateGeometry::default());

    for n in 0..30 {
        let s = est.process(frame(0.0, 0.0, 0.0, 0.0, n));
        assert!(!s.valid, "empty board sample {n} must be invalid");
        assert_eq!((s.x, s.y), (0.0, 0.0));
    }
    for n in 30..90 {
        let s = est.process(frame(15.0, 15.0, 15.0, 15.0, n));
        assert!(s.valid, "loaded sample {n} must be valid");
        assert_eq!((s.x, s.y), (0.0, 0.0));
        assert!((s.weight_kg - 60.0).abs() < 1e-4);
    }
}
