use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::city::{City, CityBuilder, DEFAULT_FILL_RATIO, DEFAULT_PLACEMENT_ATTEMPTS};
use crate::components::PaymentMode;
use crate::registry::{BusinessTypeSpec, DemandTypeSpec, TypeTables};

fn default_cycles() -> u64 {
    200
}

fn default_fill_ratio() -> f64 {
    DEFAULT_FILL_RATIO
}

fn default_placement_attempts() -> u32 {
    DEFAULT_PLACEMENT_ATTEMPTS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    pub radius: f64,
    pub population: usize,
    #[serde(default = "default_cycles")]
    pub cycles: u64,
    #[serde(default = "default_fill_ratio")]
    pub initial_fill_ratio: f64,
    #[serde(default = "default_placement_attempts")]
    pub placement_attempts: u32,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub demand_types: BTreeMap<String, DemandTypeSpec>,
    #[serde(default)]
    pub business_types: BTreeMap<String, BusinessTypeSpec>,
    /// JSON file of demand types, relative to the scenario file.
    #[serde(default)]
    pub demand_table: Option<PathBuf>,
    /// JSON file of business types, relative to the scenario file.
    #[serde(default)]
    pub business_table: Option<PathBuf>,
    #[serde(skip)]
    tables: TypeTables,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let mut scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        let mut tables = TypeTables {
            demand_types: scenario.demand_types.clone(),
            business_types: scenario.business_types.clone(),
        };
        if scenario.demand_table.is_some() || scenario.business_table.is_some() {
            let dir = path.parent().unwrap_or(self.base_dir.as_path());
            let demand = read_table(dir, scenario.demand_table.as_deref())?;
            let business = read_table(dir, scenario.business_table.as_deref())?;
            let from_files = TypeTables::from_json(&demand, &business)
                .with_context(|| format!("Invalid type tables referenced by {}", path.display()))?;
            tables
                .merge(from_files)
                .with_context(|| format!("Conflicting type tables in {}", path.display()))?;
        }
        scenario.tables = tables;
        Ok(scenario)
    }
}

fn read_table(dir: &Path, file: Option<&Path>) -> Result<String> {
    let Some(file) = file else {
        return Ok("{}".to_string());
    };
    let path = dir.join(file);
    fs::read_to_string(&path)
        .with_context(|| format!("Failed to read type table {}", path.display()))
}

impl Scenario {
    /// Demand and business tables after merging inline entries with referenced files.
    pub fn tables(&self) -> &TypeTables {
        &self.tables
    }

    pub fn cycles(&self, override_cycles: Option<u64>) -> u64 {
        override_cycles.unwrap_or(self.cycles)
    }

    pub fn builder(&self) -> CityBuilder {
        City::builder(self.name.clone(), self.radius, self.tables.clone())
            .population(self.population)
            .seed(self.seed)
            .initial_fill_ratio(self.initial_fill_ratio)
            .placement_attempts(self.placement_attempts)
            .payment_mode(self.payment_mode)
    }

    pub fn build_city(&self) -> Result<City> {
        self.builder()
            .build()
            .with_context(|| format!("Failed to build city for scenario '{}'", self.name))
    }
}
