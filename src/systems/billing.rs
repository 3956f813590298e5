use crate::{
    engine::{System, SystemContext},
    error::SimError,
    rng::SystemRng,
    world::World,
};

/// Every business pays its burn rate; the insolvent are closed after the sweep.
pub struct BillingSystem;

impl BillingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BillingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BillingSystem {
    fn name(&self) -> &str {
        "billing"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<(), SimError> {
        // Resolve every burn rate first so a bad type id aborts before any cash moves.
        let mut bills = Vec::with_capacity(world.businesses.len());
        for business in world.businesses.values() {
            let burn_rate = world.registry.business_type(business.business_type)?.burn_rate;
            bills.push((business.id, burn_rate));
        }

        let mut insolvent = Vec::new();
        for (id, burn_rate) in bills {
            if let Some(business) = world.businesses.get_mut(&id) {
                if business.burn(burn_rate) {
                    insolvent.push(id);
                }
            }
        }

        for id in insolvent {
            world.retire_business(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{PaymentMode, Person};
    use crate::registry::{TypeRegistry, TypeTables};
    use crate::rng::RngManager;
    use crate::spatial::Point;

    #[test]
    fn insolvent_business_dies_in_the_same_cycle() {
        let tables = TypeTables::default()
            .with_demand("food", 1.0, 1.0)
            .with_business("food", 0.5, 2.0, 2.0, 1.0);
        let registry = TypeRegistry::from_tables(&tables).unwrap();
        let people = vec![Person::new("p".into(), Point::ORIGIN, 1)];
        let mut world = World::new("t", 2.0, registry, people).unwrap();
        let food = world.registry().business_id("food").unwrap();
        let first = world.locations()[0].id;
        let second = world.locations()[1].id;
        let doomed = world.start_business(food, first, "doomed".into()).unwrap();
        let rich = world.start_business(food, second, "rich".into()).unwrap();
        world.business_mut(rich).unwrap().cash = 5.0;

        world.begin_cycle();
        world.begin_cycle();
        world.begin_cycle();
        let ctx = SystemContext {
            cycle: world.age(),
            payment_mode: PaymentMode::default(),
        };
        let mut rng = RngManager::new(2);
        BillingSystem::new()
            .run(&ctx, &mut world, &mut rng.stream("billing"))
            .unwrap();

        assert!(world.business(doomed).is_none());
        let dead = &world.failed_businesses()[0];
        assert_eq!(dead.id, doomed);
        assert_eq!(dead.cash, -0.5);
        assert_eq!(dead.death_cycle, Some(3));
        assert_eq!(dead.lifespan, Some(3));
        assert!(world.location(first).unwrap().is_available());

        assert_eq!(world.business(rich).unwrap().cash, 4.0);
        assert_eq!(world.events().failures, 1);
    }
}
