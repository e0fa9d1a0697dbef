/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, other: Point2D) -> Point2D {
        Point2D::new(self.x - other.x, self.y - other.y)
    }

    fn dot(self, other: Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

/// Angle in degrees at vertex `b` between the rays `b→a` and `b→c`.
///
/// The cosine is clamped to [-1, 1] before `acos`. A zero-length ray makes the
/// cosine undefined and the result is NaN; callers must treat a non-finite
/// angle as "cannot analyze".
pub fn angle_at(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let ba = a.sub(b);
    let bc = c.sub(b);
    // one square root of the product keeps exact cases exact
    let cosine = ba.dot(bc) / (ba.dot(ba) * bc.dot(bc)).sqrt();
    cosine.clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collinear_is_straight() {
        let angle = angle_at(
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        );
        assert!((angle - 180.0).abs() < 1e-9);

        let angle = angle_at(
            Point2D::new(3.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(-7.5, 0.0),
        );
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_at(
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 0.0),
            Point2D::new(0.0, 7.0),
        );
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_range_for_assorted_inputs() {
        let pts = [
            Point2D::new(-3.5, 2.0),
            Point2D::new(100.0, -42.0),
            Point2D::new(0.001, 0.002),
            Point2D::new(640.0, 480.0),
        ];
        for a in pts {
            for c in pts {
                let angle = angle_at(a, Point2D::new(1.0, 1.0), c);
                assert!((0.0..=180.0).contains(&angle), "angle {angle} out of range");
            }
        }
    }

    #[test]
    fn test_clamps_rounding_overshoot() {
        // nearly parallel rays with large coordinates: the raw cosine rounds past 1
        let b = Point2D::new(0.1, 0.1);
        let a = Point2D::new(1e8 + 0.1, 3e8 + 0.1);
        let c = Point2D::new(2e8 + 0.1, 6e8 + 0.1);
        let angle = angle_at(a, b, c);
        assert!(angle.is_finite());
        assert!(angle.abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_ray_is_nan() {
        let b = Point2D::new(5.0, 5.0);
        assert!(angle_at(b, b, Point2D::new(1.0, 0.0)).is_nan());
        assert!(angle_at(Point2D::new(1.0, 0.0), b, b).is_nan());
    }
}
