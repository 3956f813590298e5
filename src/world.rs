use std::collections::BTreeMap;

use crate::components::{Business, BusinessId, BusinessLocation, LocationId, Person};
use crate::error::SimError;
use crate::registry::{BusinessType, BusinessTypeId, TypeRegistry};
use crate::snapshot::{BusinessSnapshot, BusinessTally, DemandTally, PopulationSnapshot};
use crate::spatial::{lattice_points, Point, SpatialIndex};

/// Counters for the cycle currently in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleEvents {
    pub startups: usize,
    pub failures: usize,
    pub transactions: usize,
}

/// Positions of the active businesses, frozen for one fulfillment pass.
#[derive(Debug, Clone)]
pub struct MarketView {
    ids: Vec<BusinessId>,
    index: SpatialIndex,
}

impl MarketView {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Businesses strictly within `radius` of `position`, in ascending id order.
    pub fn candidates(&self, position: Point, radius: f64) -> Vec<BusinessId> {
        self.index
            .within(position, radius)
            .into_iter()
            .map(|index| self.ids[index])
            .collect()
    }
}

/// All state of one simulated city.
pub struct World {
    name: String,
    radius: f64,
    age: u64,
    pub(crate) registry: TypeRegistry,
    pub(crate) people: Vec<Person>,
    people_index: SpatialIndex,
    pub(crate) businesses: BTreeMap<BusinessId, Business>,
    pub(crate) locations: Vec<BusinessLocation>,
    pub(crate) failed: Vec<Business>,
    population_history: Vec<PopulationSnapshot>,
    business_history: Vec<BusinessSnapshot>,
    next_business: u64,
    pub(crate) events: CycleEvents,
}

impl World {
    /// Builds an empty city: people placed, the location lattice generated, no businesses.
    pub fn new(
        name: impl Into<String>,
        radius: f64,
        registry: TypeRegistry,
        people: Vec<Person>,
    ) -> Result<Self, SimError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SimError::geometry(format!(
                "city radius must be positive, got {radius}"
            )));
        }
        if let Some(outside) = people
            .iter()
            .find(|p| p.position.distance(Point::ORIGIN) > radius)
        {
            return Err(SimError::geometry(format!(
                "{} placed at ({}, {}) outside city radius {radius}",
                outside.name, outside.position.x, outside.position.y
            )));
        }
        let demand_count = registry.demand_types().len();
        if let Some(person) = people.iter().find(|p| p.needs.len() != demand_count) {
            return Err(SimError::config(format!(
                "{} tracks {} demand types, registry has {demand_count}",
                person.name,
                person.needs.len()
            )));
        }

        let locations = lattice_points(radius)
            .into_iter()
            .enumerate()
            .map(|(index, position)| BusinessLocation::new(LocationId(index as u32), position))
            .collect();
        let people_index = SpatialIndex::new(people.iter().map(|p| p.position).collect(), 1.0);

        Ok(Self {
            name: name.into(),
            radius,
            age: 0,
            registry,
            people,
            people_index,
            businesses: BTreeMap::new(),
            locations,
            failed: Vec::new(),
            population_history: Vec::new(),
            business_history: Vec::new(),
            next_business: 0,
            events: CycleEvents::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    /// Mutable access to one person's need accumulators; position stays fixed.
    #[cfg(test)]
    pub(crate) fn person_needs_mut(&mut self, index: usize) -> Option<&mut [f64]> {
        self.people.get_mut(index).map(|p| p.needs.as_mut_slice())
    }

    /// Indices of people strictly within `radius` of `center`, ascending.
    pub fn people_within(&self, center: Point, radius: f64) -> Vec<usize> {
        self.people_index.within(center, radius)
    }

    pub fn businesses(&self) -> impl Iterator<Item = &Business> {
        self.businesses.values()
    }

    pub fn business(&self, id: BusinessId) -> Option<&Business> {
        self.businesses.get(&id)
    }

    #[cfg(test)]
    pub(crate) fn business_mut(&mut self, id: BusinessId) -> Option<&mut Business> {
        self.businesses.get_mut(&id)
    }

    pub fn business_ids(&self) -> Vec<BusinessId> {
        self.businesses.keys().copied().collect()
    }

    pub fn active_business_count(&self) -> usize {
        self.businesses.len()
    }

    pub fn failed_businesses(&self) -> &[Business] {
        &self.failed
    }

    pub fn locations(&self) -> &[BusinessLocation] {
        &self.locations
    }

    pub fn location(&self, id: LocationId) -> Option<&BusinessLocation> {
        self.locations.get(id.index())
    }

    pub fn vacant_locations(&self) -> Vec<LocationId> {
        self.locations
            .iter()
            .filter(|l| l.is_available())
            .map(|l| l.id)
            .collect()
    }

    pub fn population_history(&self) -> &[PopulationSnapshot] {
        &self.population_history
    }

    pub fn business_history(&self) -> &[BusinessSnapshot] {
        &self.business_history
    }

    pub fn events(&self) -> CycleEvents {
        self.events
    }

    pub fn next_business_name(&self, business_type: &BusinessType) -> String {
        format!("{} #{}", business_type.name, self.next_business)
    }

    /// Mean lifespan of every business that has failed so far.
    pub fn mean_lifespan(&self) -> Option<f64> {
        let spans: Vec<u64> = self.failed.iter().filter_map(|b| b.lifespan).collect();
        if spans.is_empty() {
            return None;
        }
        Some(spans.iter().sum::<u64>() as f64 / spans.len() as f64)
    }

    pub fn market_view(&self) -> MarketView {
        let ids: Vec<BusinessId> = self.businesses.keys().copied().collect();
        let positions = self.businesses.values().map(|b| b.position).collect();
        MarketView {
            ids,
            index: SpatialIndex::new(positions, 1.0),
        }
    }

    /// Opens a business of `business_type` at a vacant location.
    pub(crate) fn start_business(
        &mut self,
        business_type: BusinessTypeId,
        location: LocationId,
        name: String,
    ) -> Result<BusinessId, SimError> {
        let initial_cash = self.registry.business_type(business_type)?.initial_cash;
        let slot = self
            .locations
            .get_mut(location.index())
            .ok_or(SimError::UnknownLocation(location))?;
        if !slot.is_available() {
            return Err(SimError::LocationOccupied(location));
        }

        let id = BusinessId(self.next_business);
        self.next_business += 1;
        slot.fill(id);
        let business = Business {
            id,
            name,
            position: slot.position,
            location,
            business_type,
            cash: initial_cash,
            birth_cycle: self.age,
            death_cycle: None,
            lifespan: None,
        };
        tracing::trace!(
            business = id.raw(),
            x = business.position.x,
            y = business.position.y,
            cycle = self.age,
            "business opened"
        );
        self.businesses.insert(id, business);
        self.events.startups += 1;
        Ok(id)
    }

    /// Closes an active business: records its death, frees its location, and files it as failed.
    pub(crate) fn retire_business(&mut self, id: BusinessId) -> Result<(), SimError> {
        let mut business = self
            .businesses
            .remove(&id)
            .ok_or(SimError::InactiveBusiness(id))?;
        business.die(self.age);
        if let Some(slot) = self.locations.get_mut(business.location.index()) {
            slot.free();
        }
        tracing::trace!(
            business = id.raw(),
            lifespan = ?business.lifespan,
            cash = business.cash,
            "business failed"
        );
        self.failed.push(business);
        self.events.failures += 1;
        Ok(())
    }

    pub(crate) fn begin_cycle(&mut self) -> u64 {
        self.age += 1;
        self.events = CycleEvents::default();
        self.age
    }

    /// Per demand type: how many people have unmet need and how much in total.
    pub fn population_snapshot(&self) -> PopulationSnapshot {
        let mut demand: Vec<DemandTally> = self
            .registry
            .demand_types()
            .iter()
            .map(|d| DemandTally::empty(d.id))
            .collect();
        for person in &self.people {
            for (tally, &amount) in demand.iter_mut().zip(&person.needs) {
                if amount > 0.0 {
                    tally.demand_count += 1;
                    tally.total_demand += amount;
                }
            }
        }
        PopulationSnapshot {
            cycle: self.age,
            demand,
        }
    }

    /// Per business type: how many businesses are active and their combined cash.
    pub fn business_snapshot(&self) -> Result<BusinessSnapshot, SimError> {
        let mut businesses: Vec<BusinessTally> = self
            .registry
            .business_types()
            .iter()
            .map(|b| BusinessTally::empty(b.id))
            .collect();
        for business in self.businesses.values() {
            self.registry.business_type(business.business_type)?;
            let tally = &mut businesses[business.business_type.index()];
            tally.count += 1;
            tally.total_cash += business.cash;
        }
        Ok(BusinessSnapshot {
            cycle: self.age,
            businesses,
        })
    }

    /// Appends both snapshots, or neither when one cannot be taken.
    pub(crate) fn record_history(&mut self) -> Result<(), SimError> {
        let business = self.business_snapshot()?;
        let population = self.population_snapshot();
        self.population_history.push(population);
        self.business_history.push(business);
        Ok(())
    }
}
