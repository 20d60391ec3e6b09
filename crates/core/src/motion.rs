use crate::types::Point;

/// Symmetric ease-in-out cubic: accelerates through the first half,
/// decelerates through the second. Input is clamped to [0, 1].
pub fn ease_in_out_cubic(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < 0.5 {
        4.0 * p * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(3) / 2.0
    }
}

/// Eased position between `from` and `to` after `elapsed` of `duration` ms.
pub fn interpolate(from: Point, to: Point, elapsed: f64, duration: f64) -> Point {
    let progress = if duration <= 0.0 { 1.0 } else { elapsed / duration };
    let e = ease_in_out_cubic(progress);
    if e >= 1.0 {
        return to;
    }
    Point {
        x: from.x + (to.x - from.x) * e,
        y: from.y + (to.y - from.y) * e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
        assert_eq!(ease_in_out_cubic(-3.0), 0.0);
        assert_eq!(ease_in_out_cubic(7.0), 1.0);
    }

    #[test]
    fn curve_is_symmetric_and_monotonic() {
        let mut last = 0.0;
        for i in 0..=100 {
            let p = i as f64 / 100.0;
            let v = ease_in_out_cubic(p);
            assert!(v >= last);
            assert!((v + ease_in_out_cubic(1.0 - p) - 1.0).abs() < 1e-9);
            last = v;
        }
    }

    #[test]
    fn overshooting_elapsed_lands_on_target() {
        let to = Point::new(400.0, 200.0);
        assert_eq!(interpolate(Point::ORIGIN, to, 1016.0, 1000.0), to);
        assert_eq!(interpolate(Point::ORIGIN, to, 0.0, 0.0), to);
    }
}
