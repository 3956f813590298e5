use crate::{
    engine::{System, SystemContext},
    error::SimError,
    rng::SystemRng,
    world::World,
};

/// Every person draws this cycle's new needs.
pub struct DemandSystem;

impl DemandSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DemandSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DemandSystem {
    fn name(&self) -> &str {
        "demand"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<(), SimError> {
        let demand_types = world.registry.demand_types();
        for person in world.people.iter_mut() {
            person.generate(demand_types, rng);
        }
        Ok(())
    }
}
