use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{BusinessTypeId, DemandTypeId};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTally {
    pub demand: DemandTypeId,
    pub demand_count: u64,
    pub total_demand: f64,
}

impl DemandTally {
    pub fn empty(demand: DemandTypeId) -> Self {
        Self {
            demand,
            demand_count: 0,
            total_demand: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessTally {
    pub business_type: BusinessTypeId,
    pub count: u64,
    pub total_cash: f64,
}

impl BusinessTally {
    pub fn empty(business_type: BusinessTypeId) -> Self {
        Self {
            business_type,
            count: 0,
            total_cash: 0.0,
        }
    }
}

/// Unmet demand across the population at the end of one cycle, indexed by demand type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub cycle: u64,
    pub demand: Vec<DemandTally>,
}

impl PopulationSnapshot {
    pub fn get(&self, id: DemandTypeId) -> Option<&DemandTally> {
        self.demand.get(id.index())
    }
}

/// Active businesses at the end of one cycle, indexed by business type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessSnapshot {
    pub cycle: u64,
    pub businesses: Vec<BusinessTally>,
}

impl BusinessSnapshot {
    pub fn get(&self, id: BusinessTypeId) -> Option<&BusinessTally> {
        self.businesses.get(id.index())
    }

    pub fn total_count(&self) -> u64 {
        self.businesses.iter().map(|t| t.count).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedDemand {
    pub demand_count: u64,
    pub total_demand: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedBusiness {
    pub count: u64,
    pub total_cash: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedCycle<T> {
    pub cycle: u64,
    pub by_type: BTreeMap<String, T>,
}

/// Full run history keyed by type name, for consumption by reporting tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryExport {
    pub city: String,
    pub seed: u64,
    pub radius: f64,
    pub age: u64,
    pub exported_at: DateTime<Utc>,
    pub population: Vec<ExportedCycle<ExportedDemand>>,
    pub businesses: Vec<ExportedCycle<ExportedBusiness>>,
    pub failed_lifespans: Vec<u64>,
    pub active_businesses: usize,
}

impl HistoryExport {
    pub fn from_world(world: &World, seed: u64) -> Self {
        let registry = world.registry();
        let population = world
            .population_history()
            .iter()
            .map(|snapshot| ExportedCycle {
                cycle: snapshot.cycle,
                by_type: snapshot
                    .demand
                    .iter()
                    .filter_map(|tally| {
                        let name = registry.demand_type(tally.demand).ok()?.name.clone();
                        Some((
                            name,
                            ExportedDemand {
                                demand_count: tally.demand_count,
                                total_demand: tally.total_demand,
                            },
                        ))
                    })
                    .collect(),
            })
            .collect();
        let businesses = world
            .business_history()
            .iter()
            .map(|snapshot| ExportedCycle {
                cycle: snapshot.cycle,
                by_type: snapshot
                    .businesses
                    .iter()
                    .filter_map(|tally| {
                        let name = registry.business_type(tally.business_type).ok()?.name.clone();
                        Some((
                            name,
                            ExportedBusiness {
                                count: tally.count,
                                total_cash: tally.total_cash,
                            },
                        ))
                    })
                    .collect(),
            })
            .collect();

        Self {
            city: world.name().to_string(),
            seed,
            radius: world.radius(),
            age: world.age(),
            exported_at: Utc::now(),
            population,
            businesses,
            failed_lifespans: world
                .failed_businesses()
                .iter()
                .filter_map(|b| b.lifespan)
                .collect(),
            active_businesses: world.active_business_count(),
        }
    }
}

pub struct HistoryWriter {
    output_dir: PathBuf,
}

impl HistoryWriter {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Writes `<output_dir>/<city>/history.json` and returns its path.
    pub fn write(&self, export: &HistoryExport) -> Result<PathBuf> {
        let dir = self.output_dir.join(sanitize(&export.city));
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create history directory {}", dir.display()))?;
        let path = dir.join("history.json");
        let json = serde_json::to_string_pretty(export).context("Failed to serialize history")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write history file {}", path.display()))?;
        Ok(path)
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "city".to_string()
    } else {
        cleaned
    }
}
