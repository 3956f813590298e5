//! Demand and business type parameter records, resolved to typed ids once at load time

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{BusinessLocation, LocationId};
use crate::error::SimError;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DemandTypeId(pub(crate) u16);

impl DemandTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for DemandTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "demand#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessTypeId(pub(crate) u16);

impl BusinessTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BusinessTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "business#{}", self.0)
    }
}

/// Raw demand-type table entry as it appears in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTypeSpec {
    #[serde(alias = "dlambda")]
    pub arrival_rate: f64,
    #[serde(alias = "dprice")]
    pub price: f64,
}

/// Raw business-type table entry as it appears in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessTypeSpec {
    #[serde(alias = "init_cash")]
    pub initial_cash: f64,
    #[serde(alias = "init_need_threshold")]
    pub need_threshold: f64,
    #[serde(alias = "init_need_radius")]
    pub need_radius: f64,
    #[serde(alias = "burnrate")]
    pub burn_rate: f64,
    /// Demand category served; defaults to the business type's own name.
    #[serde(default)]
    pub demand: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTables {
    #[serde(default)]
    pub demand_types: BTreeMap<String, DemandTypeSpec>,
    #[serde(default)]
    pub business_types: BTreeMap<String, BusinessTypeSpec>,
}

impl TypeTables {
    /// Parses the two JSON tables, demand first then business.
    pub fn from_json(demand_json: &str, business_json: &str) -> Result<Self, SimError> {
        let demand_types = serde_json::from_str(demand_json)
            .map_err(|err| SimError::config(format!("malformed demand-type table: {err}")))?;
        let business_types = serde_json::from_str(business_json)
            .map_err(|err| SimError::config(format!("malformed business-type table: {err}")))?;
        Ok(Self {
            demand_types,
            business_types,
        })
    }

    pub fn with_demand(mut self, name: &str, arrival_rate: f64, price: f64) -> Self {
        self.demand_types.insert(
            name.to_string(),
            DemandTypeSpec {
                arrival_rate,
                price,
            },
        );
        self
    }

    pub fn with_business(
        mut self,
        name: &str,
        initial_cash: f64,
        need_threshold: f64,
        need_radius: f64,
        burn_rate: f64,
    ) -> Self {
        self.business_types.insert(
            name.to_string(),
            BusinessTypeSpec {
                initial_cash,
                need_threshold,
                need_radius,
                burn_rate,
                demand: None,
            },
        );
        self
    }

    /// Moves every entry of `other` into `self`; a name present in both is an error.
    pub fn merge(&mut self, other: TypeTables) -> Result<(), SimError> {
        for (name, spec) in other.demand_types {
            if self.demand_types.insert(name.clone(), spec).is_some() {
                return Err(SimError::config(format!(
                    "demand type '{name}' defined more than once"
                )));
            }
        }
        for (name, spec) in other.business_types {
            if self.business_types.insert(name.clone(), spec).is_some() {
                return Err(SimError::config(format!(
                    "business type '{name}' defined more than once"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandType {
    pub id: DemandTypeId,
    pub name: String,
    pub arrival_rate: f64,
    pub price: f64,
}

impl DemandType {
    /// Distance a person will travel for this need, given how much of it has accumulated.
    pub fn demand_radius(&self, need_amount: f64) -> f64 {
        1.0 + need_amount / self.arrival_rate
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusinessType {
    pub id: BusinessTypeId,
    pub name: String,
    pub demand: DemandTypeId,
    pub initial_cash: f64,
    pub need_threshold: f64,
    pub need_radius: f64,
    pub burn_rate: f64,
}

impl BusinessType {
    /// How attractive `location` is for a new business of this type.
    ///
    /// Sums the matching unmet need of everyone strictly within the need radius
    /// and divides by the need threshold. A score of at least 1 justifies a startup.
    pub fn startup_score(&self, world: &World, location: &BusinessLocation) -> f64 {
        let local_demand: f64 = world
            .people_within(location.position, self.need_radius)
            .into_iter()
            .filter_map(|index| world.people().get(index))
            .map(|person| person.need(self.demand))
            .sum();
        local_demand / self.need_threshold
    }

    /// Opens a business of this type at `location`, registering it with the world.
    pub(crate) fn startup(
        &self,
        world: &mut World,
        location: LocationId,
        name: String,
    ) -> Result<crate::components::BusinessId, SimError> {
        world.start_business(self.id, location, name)
    }
}

/// Immutable registries of demand and business types, indexed by typed id.
///
/// Ids are assigned in lexicographic name order.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    demand: Vec<DemandType>,
    business: Vec<BusinessType>,
}

impl TypeRegistry {
    pub fn from_tables(tables: &TypeTables) -> Result<Self, SimError> {
        if tables.demand_types.is_empty() {
            return Err(SimError::config("at least one demand type is required"));
        }
        if tables.business_types.is_empty() {
            return Err(SimError::config("at least one business type is required"));
        }
        if tables.demand_types.len() > u16::MAX as usize
            || tables.business_types.len() > u16::MAX as usize
        {
            return Err(SimError::config("too many type definitions"));
        }

        let mut demand = Vec::with_capacity(tables.demand_types.len());
        for (index, (name, spec)) in tables.demand_types.iter().enumerate() {
            validate_demand(name, spec)?;
            demand.push(DemandType {
                id: DemandTypeId(index as u16),
                name: name.clone(),
                arrival_rate: spec.arrival_rate,
                price: spec.price,
            });
        }

        let mut business = Vec::with_capacity(tables.business_types.len());
        for (index, (name, spec)) in tables.business_types.iter().enumerate() {
            validate_business(name, spec)?;
            let category = spec.demand.as_deref().unwrap_or(name);
            let demand_id = demand
                .iter()
                .find(|d| d.name == category)
                .map(|d| d.id)
                .ok_or_else(|| {
                    SimError::config(format!(
                        "business type '{name}' serves unknown demand category '{category}'"
                    ))
                })?;
            business.push(BusinessType {
                id: BusinessTypeId(index as u16),
                name: name.clone(),
                demand: demand_id,
                initial_cash: spec.initial_cash,
                need_threshold: spec.need_threshold,
                need_radius: spec.need_radius,
                burn_rate: spec.burn_rate,
            });
        }

        Ok(Self { demand, business })
    }

    pub fn demand_types(&self) -> &[DemandType] {
        &self.demand
    }

    pub fn business_types(&self) -> &[BusinessType] {
        &self.business
    }

    pub fn demand_type(&self, id: DemandTypeId) -> Result<&DemandType, SimError> {
        self.demand.get(id.index()).ok_or(SimError::Lookup {
            kind: "demand",
            id: id.0,
        })
    }

    pub fn business_type(&self, id: BusinessTypeId) -> Result<&BusinessType, SimError> {
        self.business.get(id.index()).ok_or(SimError::Lookup {
            kind: "business",
            id: id.0,
        })
    }

    pub fn demand_id(&self, name: &str) -> Option<DemandTypeId> {
        self.demand.iter().find(|d| d.name == name).map(|d| d.id)
    }

    pub fn business_id(&self, name: &str) -> Option<BusinessTypeId> {
        self.business.iter().find(|b| b.name == name).map(|b| b.id)
    }
}

fn validate_demand(name: &str, spec: &DemandTypeSpec) -> Result<(), SimError> {
    if !(spec.arrival_rate.is_finite() && spec.arrival_rate > 0.0) {
        return Err(SimError::config(format!(
            "demand type '{name}' needs a positive arrival rate, got {}",
            spec.arrival_rate
        )));
    }
    if !(spec.price.is_finite() && spec.price >= 0.0) {
        return Err(SimError::config(format!(
            "demand type '{name}' needs a non-negative price, got {}",
            spec.price
        )));
    }
    Ok(())
}

fn validate_business(name: &str, spec: &BusinessTypeSpec) -> Result<(), SimError> {
    if !spec.initial_cash.is_finite() {
        return Err(SimError::config(format!(
            "business type '{name}' has non-finite initial cash"
        )));
    }
    if !(spec.need_threshold.is_finite() && spec.need_threshold > 0.0) {
        return Err(SimError::config(format!(
            "business type '{name}' needs a positive need threshold, got {}",
            spec.need_threshold
        )));
    }
    if !(spec.need_radius.is_finite() && spec.need_radius > 0.0) {
        return Err(SimError::config(format!(
            "business type '{name}' needs a positive need radius, got {}",
            spec.need_radius
        )));
    }
    if !(spec.burn_rate.is_finite() && spec.burn_rate >= 0.0) {
        return Err(SimError::config(format!(
            "business type '{name}' needs a non-negative burn rate, got {}",
            spec.burn_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> TypeTables {
        TypeTables::default()
            .with_demand("food", 1.0, 1.0)
            .with_demand("coffee", 2.0, 3.0)
            .with_business("food", 10.0, 2.0, 2.0, 1.0)
            .with_business("coffee", 5.0, 1.0, 3.0, 0.5)
    }

    #[test]
    fn ids_follow_name_order() {
        let registry = TypeRegistry::from_tables(&tables()).unwrap();
        assert_eq!(registry.demand_id("coffee"), Some(DemandTypeId(0)));
        assert_eq!(registry.demand_id("food"), Some(DemandTypeId(1)));
        assert_eq!(registry.business_id("coffee"), Some(BusinessTypeId(0)));
        let food = registry.business_type(BusinessTypeId(1)).unwrap();
        assert_eq!(food.demand, DemandTypeId(1));
    }

    #[test]
    fn demand_radius_grows_with_need() {
        let registry = TypeRegistry::from_tables(&tables()).unwrap();
        let coffee = registry.demand_type(DemandTypeId(0)).unwrap();
        assert_eq!(coffee.demand_radius(0.0), 1.0);
        assert_eq!(coffee.demand_radius(4.0), 3.0);
        assert!(coffee.demand_radius(4.1) > coffee.demand_radius(4.0));
    }

    #[test]
    fn unknown_demand_category_is_config_error() {
        let tables = TypeTables::default()
            .with_demand("food", 1.0, 1.0)
            .with_business("diner", 10.0, 2.0, 2.0, 1.0);
        let err = TypeRegistry::from_tables(&tables).unwrap_err();
        assert!(matches!(err, SimError::Config(_)), "{err}");
    }

    #[test]
    fn explicit_demand_category_is_resolved() {
        let mut tables = TypeTables::default()
            .with_demand("food", 1.0, 1.0)
            .with_business("diner", 10.0, 2.0, 2.0, 1.0);
        tables
            .business_types
            .get_mut("diner")
            .unwrap()
            .demand = Some("food".into());
        let registry = TypeRegistry::from_tables(&tables).unwrap();
        let diner = registry.business_type(BusinessTypeId(0)).unwrap();
        assert_eq!(diner.demand, registry.demand_id("food").unwrap());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let zero_rate = TypeTables::default()
            .with_demand("food", 0.0, 1.0)
            .with_business("food", 10.0, 2.0, 2.0, 1.0);
        assert!(matches!(
            TypeRegistry::from_tables(&zero_rate),
            Err(SimError::Config(_))
        ));

        let zero_threshold = TypeTables::default()
            .with_demand("food", 1.0, 1.0)
            .with_business("food", 10.0, 0.0, 2.0, 1.0);
        assert!(matches!(
            TypeRegistry::from_tables(&zero_threshold),
            Err(SimError::Config(_))
        ));

        let empty = TypeTables::default().with_demand("food", 1.0, 1.0);
        assert!(matches!(
            TypeRegistry::from_tables(&empty),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn json_tables_accept_historical_field_names() {
        let demand = r#"{"food": {"dlambda": 1.5, "dprice": 4.0}}"#;
        let business = r#"{"food": {"init_cash": 100, "init_need_threshold": 20,
                           "init_need_radius": 3, "burnrate": 5}}"#;
        let tables = TypeTables::from_json(demand, business).unwrap();
        assert_eq!(tables.demand_types["food"].arrival_rate, 1.5);
        assert_eq!(tables.business_types["food"].burn_rate, 5.0);
    }

    #[test]
    fn json_table_missing_field_is_config_error() {
        let demand = r#"{"food": {"dlambda": 1.5}}"#;
        let business = r#"{}"#;
        let err = TypeTables::from_json(demand, business).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn lookup_of_missing_id_fails() {
        let registry = TypeRegistry::from_tables(&tables()).unwrap();
        let err = registry.business_type(BusinessTypeId(9)).unwrap_err();
        assert_eq!(
            err,
            SimError::Lookup {
                kind: "business",
                id: 9
            }
        );
    }

    #[test]
    fn merging_duplicate_names_fails() {
        let mut base = TypeTables::default().with_demand("food", 1.0, 1.0);
        let other = TypeTables::default().with_demand("food", 2.0, 1.0);
        assert!(base.merge(other).is_err());
    }
}
