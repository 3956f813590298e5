use std::time::Instant;

use crate::components::PaymentMode;
use crate::error::SimError;
use crate::rng::{RngManager, SystemRng};
use crate::systems::{BillingSystem, DemandSystem, FulfillmentSystem, StartupSystem};
use crate::world::World;

pub struct SystemContext {
    pub cycle: u64,
    pub payment_mode: PaymentMode,
}

/// One phase of a city cycle.
///
/// A phase may mutate only the world it is handed, and must leave every
/// structural change applied before it returns.
pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<(), SimError>;
}

#[derive(Clone, Debug)]
pub struct PhaseReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct CycleSummary {
    pub cycle: u64,
    pub startups: usize,
    pub failures: usize,
    pub transactions: usize,
    pub active_businesses: usize,
    pub phases: Vec<PhaseReport>,
}

/// Runs the fixed phase pipeline: demand, startup, fulfillment, billing, then history.
pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    payment_mode: PaymentMode,
}

impl Engine {
    pub fn new(rng: RngManager, payment_mode: PaymentMode) -> Self {
        Self {
            rng,
            systems: vec![
                Box::new(DemandSystem::new()),
                Box::new(StartupSystem::new()),
                Box::new(FulfillmentSystem::new()),
                Box::new(BillingSystem::new()),
            ],
            payment_mode,
        }
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.payment_mode
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn cycle(&mut self, world: &mut World) -> Result<CycleSummary, SimError> {
        let cycle = world.begin_cycle();
        let ctx = SystemContext {
            cycle,
            payment_mode: self.payment_mode,
        };
        let mut phases = Vec::with_capacity(self.systems.len() + 1);
        for system in &mut self.systems {
            let start = Instant::now();
            let mut rng_stream = self.rng.stream(system.name());
            system.run(&ctx, world, &mut rng_stream)?;
            phases.push(PhaseReport {
                name: system.name().to_string(),
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }

        let start = Instant::now();
        world.record_history()?;
        phases.push(PhaseReport {
            name: "snapshot".to_string(),
            duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
        });

        let events = world.events();
        let summary = CycleSummary {
            cycle,
            startups: events.startups,
            failures: events.failures,
            transactions: events.transactions,
            active_businesses: world.active_business_count(),
            phases,
        };
        tracing::debug!(
            cycle,
            startups = summary.startups,
            failures = summary.failures,
            transactions = summary.transactions,
            active = summary.active_businesses,
            "cycle complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Person;
    use crate::registry::{TypeRegistry, TypeTables};
    use crate::spatial::Point;

    fn world() -> World {
        let tables = TypeTables::default()
            .with_demand("food", 2.0, 1.0)
            .with_business("food", 5.0, 1.0, 3.0, 1.0);
        let registry = TypeRegistry::from_tables(&tables).unwrap();
        let people = vec![
            Person::new("a".into(), Point::ORIGIN, 1),
            Person::new("b".into(), Point::new(1.0, 1.0), 1),
        ];
        World::new("t", 3.0, registry, people).unwrap()
    }

    #[test]
    fn phases_run_in_fixed_order() {
        let engine = Engine::new(RngManager::new(1), PaymentMode::default());
        assert_eq!(
            engine.phase_names(),
            vec!["demand", "startup", "fulfillment", "billing"]
        );
    }

    #[test]
    fn cycle_records_one_snapshot_pair() {
        let mut world = world();
        let mut engine = Engine::new(RngManager::new(1), PaymentMode::default());
        let summary = engine.cycle(&mut world).unwrap();
        assert_eq!(summary.cycle, 1);
        assert_eq!(summary.phases.len(), 5);
        assert_eq!(world.population_history().len(), 1);
        assert_eq!(world.business_history().len(), 1);
        assert_eq!(world.business_history()[0].cycle, 1);
        assert_eq!(summary.active_businesses, world.active_business_count());
        assert_eq!(summary.startups, world.events().startups);
    }
}
