use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::components::{Business, BusinessLocation, PaymentMode, Person};
use crate::engine::{CycleSummary, Engine};
use crate::error::SimError;
use crate::registry::{TypeRegistry, TypeTables};
use crate::rng::{self, RngManager};
use crate::snapshot::{BusinessSnapshot, HistoryExport, PopulationSnapshot};
use crate::spatial::Point;
use crate::world::World;

pub const DEFAULT_SEED: u64 = 7;
pub const DEFAULT_FILL_RATIO: f64 = 0.75;
pub const DEFAULT_PLACEMENT_ATTEMPTS: u32 = 10_000;

pub struct CityBuilder {
    name: String,
    radius: f64,
    population: usize,
    tables: TypeTables,
    seed: u64,
    fill_ratio: f64,
    placement_attempts: u32,
    payment_mode: PaymentMode,
    positions: Option<Vec<Point>>,
}

impl CityBuilder {
    pub fn new(name: impl Into<String>, radius: f64, tables: TypeTables) -> Self {
        Self {
            name: name.into(),
            radius,
            population: 0,
            tables,
            seed: DEFAULT_SEED,
            fill_ratio: DEFAULT_FILL_RATIO,
            placement_attempts: DEFAULT_PLACEMENT_ATTEMPTS,
            payment_mode: PaymentMode::default(),
            positions: None,
        }
    }

    pub fn population(mut self, population: usize) -> Self {
        self.population = population;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fraction of business locations seeded with a random business type at construction.
    pub fn initial_fill_ratio(mut self, ratio: f64) -> Self {
        self.fill_ratio = ratio;
        self
    }

    pub fn placement_attempts(mut self, attempts: u32) -> Self {
        self.placement_attempts = attempts;
        self
    }

    pub fn payment_mode(mut self, mode: PaymentMode) -> Self {
        self.payment_mode = mode;
        self
    }

    /// Places people at exactly these positions instead of sampling them.
    pub fn people_at(mut self, positions: Vec<Point>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn build(self) -> Result<City, SimError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(SimError::geometry(format!(
                "city radius must be positive, got {}",
                self.radius
            )));
        }
        if !(0.0..=1.0).contains(&self.fill_ratio) {
            return Err(SimError::config(format!(
                "initial fill ratio must lie in [0, 1], got {}",
                self.fill_ratio
            )));
        }
        let registry = TypeRegistry::from_tables(&self.tables)?;
        let demand_count = registry.demand_types().len();
        let mut rng = RngManager::new(self.seed);

        let positions = match self.positions {
            Some(positions) => positions,
            None => {
                let mut placement = rng.stream("placement");
                (0..self.population)
                    .map(|_| sample_position(&mut placement, self.radius, self.placement_attempts))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        let people = positions
            .into_iter()
            .enumerate()
            .map(|(i, position)| Person::new(format!("Resident {i}"), position, demand_count))
            .collect();

        let mut world = World::new(self.name, self.radius, registry, people)?;
        seed_businesses(&mut world, &mut rng.stream("seeding"), self.fill_ratio)?;
        world.record_history()?;

        tracing::info!(
            city = world.name(),
            people = world.people().len(),
            locations = world.locations().len(),
            businesses = world.active_business_count(),
            seed = self.seed,
            "city constructed"
        );

        Ok(City {
            world,
            engine: Engine::new(rng, self.payment_mode),
        })
    }
}

/// Normal draw on each axis scaled by the radius, rejected until it lands in the disk.
fn sample_position<R: Rng + ?Sized>(
    rng: &mut R,
    radius: f64,
    max_attempts: u32,
) -> Result<Point, SimError> {
    for _ in 0..max_attempts {
        let point = Point::new(rng::normal(rng, 0.0, radius), rng::normal(rng, 0.0, radius));
        if point.distance(Point::ORIGIN) <= radius {
            return Ok(point);
        }
    }
    Err(SimError::geometry(format!(
        "no placement inside radius {radius} after {max_attempts} attempts"
    )))
}

fn seed_businesses<R: Rng + ?Sized>(
    world: &mut World,
    rng: &mut R,
    fill_ratio: f64,
) -> Result<(), SimError> {
    let location_count = world.locations().len();
    let fill = (location_count as f64 * fill_ratio) as usize;
    let business_types = world.registry().business_types().to_vec();
    for slot in index::sample(rng, location_count, fill).into_iter() {
        let business_type = business_types
            .choose(rng)
            .ok_or_else(|| SimError::config("no business types to seed"))?;
        let location = world.locations()[slot].id;
        let name = world.next_business_name(business_type);
        business_type.startup(world, location, name)?;
    }
    Ok(())
}

/// A simulated city: owns all state and advances it one cycle at a time.
pub struct City {
    world: World,
    engine: Engine,
}

impl City {
    /// Builds a city with the default seed, fill ratio, and payment mode.
    pub fn construct(
        name: impl Into<String>,
        radius: f64,
        population_size: usize,
        tables: TypeTables,
    ) -> Result<Self, SimError> {
        CityBuilder::new(name, radius, tables)
            .population(population_size)
            .build()
    }

    pub fn builder(name: impl Into<String>, radius: f64, tables: TypeTables) -> CityBuilder {
        CityBuilder::new(name, radius, tables)
    }

    /// Advances the city by one cycle. On error nothing is added to the histories.
    pub fn cycle(&mut self) -> Result<CycleSummary, SimError> {
        self.engine.cycle(&mut self.world)
    }

    /// Runs `cycles` cycles in order, stopping at the first failure.
    pub fn run(&mut self, cycles: u64) -> Result<(), SimError> {
        for _ in 0..cycles {
            self.cycle()?;
        }
        tracing::info!(
            city = self.world.name(),
            age = self.world.age(),
            active = self.world.active_business_count(),
            failed = self.world.failed_businesses().len(),
            "run complete"
        );
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.world.name()
    }

    pub fn age(&self) -> u64 {
        self.world.age()
    }

    pub fn seed(&self) -> u64 {
        self.engine.seed()
    }

    pub fn payment_mode(&self) -> PaymentMode {
        self.engine.payment_mode()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn people(&self) -> &[Person] {
        self.world.people()
    }

    pub fn businesses(&self) -> impl Iterator<Item = &Business> {
        self.world.businesses()
    }

    pub fn failed_businesses(&self) -> &[Business] {
        self.world.failed_businesses()
    }

    pub fn locations(&self) -> &[BusinessLocation] {
        self.world.locations()
    }

    pub fn population_snapshot(&self) -> PopulationSnapshot {
        self.world.population_snapshot()
    }

    pub fn business_snapshot(&self) -> Result<BusinessSnapshot, SimError> {
        self.world.business_snapshot()
    }

    pub fn population_history(&self) -> &[PopulationSnapshot] {
        self.world.population_history()
    }

    pub fn business_history(&self) -> &[BusinessSnapshot] {
        self.world.business_history()
    }

    pub fn export_history(&self) -> HistoryExport {
        HistoryExport::from_world(&self.world, self.seed())
    }
}
