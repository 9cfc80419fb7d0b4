//! Property-based tests using proptest
//!
//! Invariants that must hold for ALL inputs:
//! - Tessellation: deterministic, covers the clip box, cells don't overlap
//! - Fracture: fragment count never exceeds the seed count
//! - Lifecycle: destroyed entities never come back

use bevy::prelude::*;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use shatter_core::config::ShatterConfig;
use shatter_core::destructible::{DestructibleDesc, DestructibleState};
use shatter_core::fracture::{self, tessellate, Cell, ClipBox, FractureRequest};
use shatter_core::world::RapierWorld;
use shatter_core::ShatterSim;

fn unit_box() -> ClipBox {
    ClipBox::from_half_extents(Vec3::ZERO, Vec3::splat(0.5))
}

fn seed_strategy(max: usize) -> impl Strategy<Value = Vec<Vec3>> {
    prop::collection::vec((-0.5f32..0.5, -0.5f32..0.5, -0.5f32..0.5), 1..max)
        .prop_map(|points| points.into_iter().map(|(x, y, z)| Vec3::new(x, y, z)).collect())
}

// ============================================================
// Tessellation Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_tessellation_is_deterministic(seeds in seed_strategy(40)) {
        let first = tessellate(&seeds, &unit_box());
        let second = tessellate(&seeds, &unit_box());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_cells_cover_clip_box(seeds in seed_strategy(40)) {
        let bounds = unit_box();
        let cells = tessellate(&seeds, &bounds);
        let total: f32 = cells.iter().filter(|c| !c.is_degenerate()).map(Cell::volume).sum();
        prop_assert!(
            (total - bounds.volume()).abs() < 1.0e-2 * bounds.volume(),
            "covered {} of {}", total, bounds.volume()
        );
    }

    #[test]
    fn prop_cells_do_not_overlap(seeds in seed_strategy(24)) {
        for cell in tessellate(&seeds, &unit_box()).iter().filter(|c| !c.is_degenerate()) {
            let centroid = cell.centroid();
            let own = centroid.distance(cell.seed);
            for other in &seeds {
                prop_assert!(own <= centroid.distance(*other) + 1.0e-4);
            }
        }
    }

    #[test]
    fn prop_at_most_one_cell_per_seed(seeds in seed_strategy(40)) {
        let cells = tessellate(&seeds, &unit_box());
        prop_assert!(cells.len() <= seeds.len());
        for pair in cells.windows(2) {
            prop_assert!(pair[0].seed_index < pair[1].seed_index);
        }
    }
}

// ============================================================
// Fracture Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_fragment_count_bounded_by_seeds(rng_seed in any::<u64>(), points in 1usize..48) {
        let mut config = ShatterConfig::default();
        config.fracture.points = points;
        let mut physics = RapierWorld::default();
        let mut scene = World::new();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(rng_seed);
        let request = FractureRequest {
            impact_point: Vec3::new(0.0, 1.0, 0.0),
            source_tint: None,
            source_bounds: None,
        };

        let outcome = fracture::shatter(&request, &config, &mut rng, &mut physics, &mut scene);
        prop_assert!(outcome.fragments.len() <= points + 1);
        prop_assert!(!outcome.fragments.is_empty());
        prop_assert_eq!(outcome.fragments.len() + outcome.skipped, outcome.cells);
    }

    #[test]
    fn prop_destroyed_stays_destroyed(rng_seed in any::<u64>(), hits in prop::collection::vec(0usize..3, 1..8)) {
        let config = ShatterConfig { rng_seed: Some(rng_seed), ..ShatterConfig::default() };
        let mut sim = ShatterSim::with_rapier(config).unwrap();
        let mut scene = World::new();
        let ids: Vec<_> = (0..3)
            .map(|i| {
                let desc = DestructibleDesc::bottle(format!("b{i}"), 0.1, 0.4).at(Vec3::X * i as f32);
                sim.spawn_destructible(&mut scene, &desc).unwrap()
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        for index in hits {
            let id = ids[index];
            let before = sim.fragment_count();
            let report = sim.impact(&mut scene, id, Vec3::new(index as f32, 0.2, 0.0), None, None);
            if seen.insert(index) {
                prop_assert!(report.is_some());
            } else {
                prop_assert!(report.is_none());
                prop_assert_eq!(sim.fragment_count(), before);
            }
            prop_assert_eq!(sim.state(id), Some(DestructibleState::Destroyed));
        }
        prop_assert_eq!(sim.destroyed_count(), seen.len());
    }
}
