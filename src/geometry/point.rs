use nalgebra::{Point2, Vector2};
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::{StandardNormal, Uniform};

use super::rect::Rect;

// Expects each component to be drawn from a standard normal, which makes the
// normalized result uniform over the circle.
pub fn random_unit_vector<R: Rng>(rng: &mut R) -> Vector2<f64> {
    loop {
        let x: f64 = StandardNormal.sample(rng);
        let y: f64 = StandardNormal.sample(rng);
        let v = Vector2::new(x, y);
        if v.norm() > 1e-12 {
            return v.normalize();
        }
    }
}

/// A random unit vector whose vertical component carries the given sign, used
/// to point particles away from the membrane after a crossing or a bounce.
pub fn random_unit_vector_away<R: Rng>(rng: &mut R, y_sign: f64) -> Vector2<f64> {
    let v = random_unit_vector(rng);
    Vector2::new(v.x, v.y.abs() * y_sign.signum())
}

/// Linear blend of `current` toward `target`, renormalized. `alpha` is
/// expected to be clamped to [0, 1] by the caller's timestep logic; we clamp
/// again so an oversized timestep cannot overshoot.
pub fn blend_direction(current: Vector2<f64>, target: Vector2<f64>, alpha: f64) -> Vector2<f64> {
    let alpha = alpha.clamp(0.0, 1.0);
    let blended = current.lerp(&target, alpha);
    if blended.norm() > 1e-12 {
        blended.normalize()
    } else {
        // Opposed vectors can cancel exactly at alpha 0.5.
        target
    }
}

pub fn random_point_in<R: Rng>(rng: &mut R, rect: &Rect) -> Point2<f64> {
    let ux = Uniform::new(rect.min.x, rect.max.x);
    let uy = Uniform::new(rect.min.y, rect.max.y);
    Point2::new(ux.sample(rng), uy.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        for _ in 0..100 {
            let v = random_unit_vector(&mut rng);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_random_unit_vector_away_respects_sign() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        for _ in 0..100 {
            assert!(random_unit_vector_away(&mut rng, -1.0).y <= 0.0);
            assert!(random_unit_vector_away(&mut rng, 1.0).y >= 0.0);
        }
    }

    #[test]
    fn test_blend_direction_endpoints() {
        let a = Vector2::new(1.0, 0.0);
        let b = Vector2::new(0.0, 1.0);
        assert_relative_eq!(blend_direction(a, b, 0.0).x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(blend_direction(a, b, 1.0).y, 1.0, epsilon = 1e-12);
        // Halfway lands on the diagonal, renormalized.
        let mid = blend_direction(a, b, 0.5);
        assert_relative_eq!(mid.x, mid.y, epsilon = 1e-12);
        assert_relative_eq!(mid.norm(), 1.0, epsilon = 1e-12);
    }
}
