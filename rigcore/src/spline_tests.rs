use crate::SplineCurves;
use glam::Vec3;

fn assert_approx(actual: f32, expected: f32, tolerance: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

#[test]
fn param_at_distance_walks_the_arc_length() {
    let spline = SplineCurves::from_positions(&[
        Vec3::ZERO,
        Vec3::new(2.0, 0.0, 0.0),
        Vec3::new(4.0, 0.0, 0.0),
    ]);
    assert_approx(spline.length(), 4.0, 1.0e-3);

    for distance in [0.5, 1.0, 2.5, 3.75] {
        let param = spline.param_at_distance(distance);
        assert_approx(spline.position(param).x, distance, 1.0e-2);
        assert_approx(spline.distance_at_param(param), distance, 1.0e-4);
    }

    assert_eq!(spline.param_at_distance(-1.0), 0.0);
    assert_approx(spline.param_at_distance(10.0), spline.max_param(), 1.0e-6);
}

#[test]
fn empty_spline_maps_everything_to_zero() {
    let spline = SplineCurves::default();
    assert_eq!(spline.param_at_distance(1.0), 0.0);
    assert_eq!(spline.distance_at_param(1.0), 0.0);
}
