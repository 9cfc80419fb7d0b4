//! Fracture seed clouds.

use bevy::prelude::*;
use rand::Rng;

/// Seed points driving one tessellation: the origin first, then the random cloud
#[derive(Debug, Clone, PartialEq)]
pub struct FractureSeedSet {
    pub origin: Vec3,
    points: Vec<Vec3>,
}

impl FractureSeedSet {
    /// One seed at `origin` plus `count` seeds uniform in the ball of `radius` around it
    pub fn generate<R: Rng + ?Sized>(origin: Vec3, count: usize, radius: f32, rng: &mut R) -> Self {
        let mut points = Vec::with_capacity(count + 1);
        points.push(origin);
        for _ in 0..count {
            points.push(origin + random_in_ball(rng) * radius);
        }
        Self { origin, points }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Uniform point in the unit ball (rejection sampling from the cube)
fn random_in_ball<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_origin_comes_first() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let seeds = FractureSeedSet::generate(origin, 12, 0.5, &mut rng);
        assert_eq!(seeds.len(), 13);
        assert_eq!(seeds.points()[0], origin);
    }

    #[test]
    fn test_points_inside_radius() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let seeds = FractureSeedSet::generate(Vec3::ZERO, 256, 0.75, &mut rng);
        assert!(seeds.points().iter().all(|p| p.length() <= 0.75 + 1.0e-6));
    }

    #[test]
    fn test_same_rng_seed_same_cloud() {
        let a = FractureSeedSet::generate(Vec3::ZERO, 32, 1.0, &mut Xoshiro256PlusPlus::seed_from_u64(9));
        let b = FractureSeedSet::generate(Vec3::ZERO, 32, 1.0, &mut Xoshiro256PlusPlus::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_count_is_origin_only() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let seeds = FractureSeedSet::generate(Vec3::ONE, 0, 1.0, &mut rng);
        assert_eq!(seeds.points(), &[Vec3::ONE]);
    }
}
