use crate::{
    components::LocationId,
    engine::{System, SystemContext},
    error::SimError,
    registry::BusinessTypeId,
    rng::SystemRng,
    world::World,
};

/// Vacant locations are scored against every business type; the best type
/// opens there when its score reaches 1.
pub struct StartupSystem;

impl StartupSystem {
    pub fn new() -> Self {
        Self
    }

    /// The highest-scoring business type for one location.
    ///
    /// Types are visited in id order and only a strictly greater score
    /// displaces the current best, so ties go to the lowest id.
    pub fn best_type(world: &World, location: LocationId) -> Option<(BusinessTypeId, f64)> {
        let location = world.location(location)?;
        let mut best: Option<(BusinessTypeId, f64)> = None;
        for business_type in world.registry.business_types() {
            let score = business_type.startup_score(world, location);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((business_type.id, score));
            }
        }
        best
    }
}

impl Default for StartupSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for StartupSystem {
    fn name(&self) -> &str {
        "startup"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<(), SimError> {
        let mut openings = Vec::new();
        for location in world.vacant_locations() {
            if let Some((business_type, score)) = Self::best_type(world, location) {
                if score >= 1.0 {
                    openings.push((location, business_type));
                }
            }
        }

        for (location, business_type) in openings {
            let business_type = world.registry.business_type(business_type)?.clone();
            let name = world.next_business_name(&business_type);
            business_type.startup(world, location, name)?;
        }
        Ok(())
    }
}
