use nalgebra::Point2;

use crate::geometry::Rect;
use crate::membrane::Side;

/// World geometry: a box split horizontally by the membrane band centered on
/// y = 0. Particles random-walk within the rectangle of their current side
/// and only leave it through a crossing.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug)]
pub struct WorldConfig {
    pub half_width: f64,
    pub half_height: f64,
    pub membrane_half_thickness: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            half_width: 100.0,
            half_height: 100.0,
            membrane_half_thickness: 5.0,
        }
    }
}

impl WorldConfig {
    /// The bounding box of one side, membrane face included.
    pub fn region(&self, side: Side) -> Rect {
        match side {
            Side::Outside => Rect::new(
                Point2::new(-self.half_width, self.membrane_half_thickness),
                Point2::new(self.half_width, self.half_height),
            ),
            Side::Inside => Rect::new(
                Point2::new(-self.half_width, -self.half_height),
                Point2::new(self.half_width, -self.membrane_half_thickness),
            ),
        }
    }

    /// Whether a disc of radius `r` at height `y` touches the membrane band.
    pub fn touches_membrane(&self, y: f64, r: f64) -> bool {
        y.abs() - r < self.membrane_half_thickness
    }

    /// Whether a disc of radius `r` at height `y` is fully clear of the band,
    /// with a small margin so traversal does not immediately re-trigger.
    pub fn clear_of_membrane(&self, y: f64, r: f64, margin: f64) -> bool {
        y.abs() - r > self.membrane_half_thickness + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_meet_at_membrane_faces() {
        let world = WorldConfig::default();
        let outside = world.region(Side::Outside);
        let inside = world.region(Side::Inside);
        assert_eq!(outside.min.y, world.membrane_half_thickness);
        assert_eq!(inside.max.y, -world.membrane_half_thickness);
        assert!(outside.contains(&Point2::new(0.0, 50.0)));
        assert!(inside.contains(&Point2::new(0.0, -50.0)));
        assert!(!outside.contains(&Point2::new(0.0, -50.0)));
    }

    #[test]
    fn test_membrane_touch_and_clear() {
        let world = WorldConfig::default();
        assert!(world.touches_membrane(6.0, 2.0));
        assert!(!world.touches_membrane(10.0, 2.0));
        assert!(world.clear_of_membrane(-10.0, 2.0, 1.0));
        assert!(!world.clear_of_membrane(-7.5, 2.0, 1.0));
    }
}
