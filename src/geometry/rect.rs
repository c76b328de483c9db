use nalgebra::{Point2, Vector2};

/// Axis-aligned rectangle in model coordinates.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Point2<f64>,
    pub max: Point2<f64>,
}

impl Rect {
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y);
        Rect { min, max }
    }

    pub fn contains(&self, p: &Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// The rectangle shrunk by `margin` on every side, i.e. the region a disc
    /// of radius `margin` may occupy while staying fully inside.
    pub fn shrink(&self, margin: f64) -> Rect {
        Rect {
            min: Point2::new(self.min.x + margin, self.min.y + margin),
            max: Point2::new(self.max.x - margin, self.max.y - margin),
        }
    }

    /// Reflects `position` back inside, mirroring about each violated wall
    /// independently and flipping the matching component of `direction`.
    /// Returns true if any wall was hit.
    pub fn reflect(&self, position: &mut Point2<f64>, direction: &mut Vector2<f64>) -> bool {
        let mut bounced = false;
        for axis in 0..2 {
            if position[axis] < self.min[axis] {
                position[axis] = 2.0 * self.min[axis] - position[axis];
                direction[axis] = direction[axis].abs();
                bounced = true;
            } else if position[axis] > self.max[axis] {
                position[axis] = 2.0 * self.max[axis] - position[axis];
                direction[axis] = -direction[axis].abs();
                bounced = true;
            }
        }
        bounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reflect_mirrors_and_flips() {
        let rect = Rect::new(Point2::new(-10.0, -10.0), Point2::new(10.0, 10.0));
        let mut p = Point2::new(12.0, -11.0);
        let mut d = Vector2::new(1.0, -1.0).normalize();
        assert!(rect.reflect(&mut p, &mut d));
        assert_relative_eq!(p.x, 8.0);
        assert_relative_eq!(p.y, -9.0);
        assert!(d.x < 0.0);
        assert!(d.y > 0.0);
    }

    #[test]
    fn test_reflect_noop_inside() {
        let rect = Rect::new(Point2::new(-10.0, -10.0), Point2::new(10.0, 10.0));
        let mut p = Point2::new(0.0, 0.0);
        let mut d = Vector2::new(0.0, 1.0);
        assert!(!rect.reflect(&mut p, &mut d));
        assert_relative_eq!(p.y, 0.0);
    }
}
