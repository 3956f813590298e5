use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use storefront::{
    registry::TypeRegistry,
    rng::poisson,
    spatial::{lattice_points, Point, SpatialIndex},
    TypeTables,
};

proptest! {
    #[test]
    fn demand_radius_is_one_at_zero_and_increasing(
        rate in 0.01f64..50.0,
        a in 0.0f64..1_000.0,
        delta in 0.001f64..100.0,
    ) {
        let tables = TypeTables::default()
            .with_demand("food", rate, 1.0)
            .with_business("food", 1.0, 1.0, 1.0, 1.0);
        let registry = TypeRegistry::from_tables(&tables).unwrap();
        let food = &registry.demand_types()[0];
        prop_assert_eq!(food.demand_radius(0.0), 1.0);
        prop_assert!(food.demand_radius(a + delta) > food.demand_radius(a));
    }

    #[test]
    fn poisson_draws_are_finite_counts(seed in any::<u64>(), rate in 0.0f64..200.0) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let draw = poisson(&mut rng, rate);
        prop_assert!(draw < 10_000);
    }

    #[test]
    fn lattice_stays_inside_disk(radius in 0.1f64..12.0) {
        for point in lattice_points(radius) {
            prop_assert!(point.distance(Point::ORIGIN) < radius);
            prop_assert_eq!(point.x.fract(), 0.0);
            prop_assert_eq!(point.y.fract(), 0.0);
        }
    }

    #[test]
    fn spatial_index_agrees_with_scan(
        coords in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 0..60),
        cx in -10.0f64..10.0,
        cy in -10.0f64..10.0,
        radius in 0.0f64..25.0,
    ) {
        let points: Vec<Point> = coords.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let index = SpatialIndex::new(points.clone(), 1.0);
        let center = Point::new(cx, cy);
        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.inside(center, radius))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(index.within(center, radius), expected);
    }
}
