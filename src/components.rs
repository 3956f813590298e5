use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::registry::{BusinessTypeId, DemandType, DemandTypeId};
use crate::rng;
use crate::spatial::Point;
use crate::world::MarketView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub(crate) u64);

impl BusinessId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub(crate) u32);

impl LocationId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a satisfied need is converted into business revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Credits the accumulated need multiplied by the unit price again.
    #[default]
    PriceReapplied,
    /// Credits the accumulated need as is; it already counts quantity × price.
    QuantityTimesPrice,
}

impl PaymentMode {
    pub fn payment(self, need_amount: f64, price: f64) -> f64 {
        match self {
            PaymentMode::PriceReapplied => need_amount * price,
            PaymentMode::QuantityTimesPrice => need_amount,
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMode::PriceReapplied => f.write_str("price_reapplied"),
            PaymentMode::QuantityTimesPrice => f.write_str("quantity_times_price"),
        }
    }
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "price_reapplied" => Ok(PaymentMode::PriceReapplied),
            "quantity_times_price" => Ok(PaymentMode::QuantityTimesPrice),
            other => Err(format!(
                "unknown payment mode '{other}' (expected price_reapplied or quantity_times_price)"
            )),
        }
    }
}

/// Revenue moved from one person to one business for one demand type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transaction {
    pub business: BusinessId,
    pub demand: DemandTypeId,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub position: Point,
    /// Unmet need per demand type, indexed by `DemandTypeId`.
    pub needs: Vec<f64>,
}

impl Person {
    pub fn new(name: String, position: Point, demand_types: usize) -> Self {
        Self {
            name,
            position,
            needs: vec![0.0; demand_types],
        }
    }

    pub fn need(&self, demand: DemandTypeId) -> f64 {
        self.needs.get(demand.index()).copied().unwrap_or(0.0)
    }

    /// Draws this cycle's new demand for every type and adds it to the accumulators.
    pub fn generate<R: Rng + ?Sized>(&mut self, demand_types: &[DemandType], rng: &mut R) {
        for demand in demand_types {
            let arrivals = rng::poisson(rng, demand.arrival_rate);
            if let Some(need) = self.needs.get_mut(demand.id.index()) {
                *need += arrivals as f64 * demand.price;
            }
        }
    }

    /// Tries to satisfy every positive need at a business inside its search radius.
    ///
    /// A need with no reachable business carries over unchanged. Each satisfied
    /// need is zeroed and reported as a transaction for the caller to credit.
    pub fn fulfill<R: Rng + ?Sized>(
        &mut self,
        market: &MarketView,
        demand_types: &[DemandType],
        mode: PaymentMode,
        rng: &mut R,
    ) -> Vec<Transaction> {
        let mut transactions = Vec::new();
        for demand in demand_types {
            let amount = self.need(demand.id);
            if amount <= 0.0 {
                continue;
            }
            let radius = demand.demand_radius(amount);
            let candidates = market.candidates(self.position, radius);
            if let Some(&business) = candidates.choose(rng) {
                transactions.push(Transaction {
                    business,
                    demand: demand.id,
                    amount: mode.payment(amount, demand.price),
                });
                self.needs[demand.id.index()] = 0.0;
            }
        }
        transactions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub position: Point,
    pub location: LocationId,
    pub business_type: BusinessTypeId,
    pub cash: f64,
    pub birth_cycle: u64,
    pub death_cycle: Option<u64>,
    pub lifespan: Option<u64>,
}

impl Business {
    pub fn is_alive(&self) -> bool {
        self.death_cycle.is_none()
    }

    pub fn age(&self, current_cycle: u64) -> u64 {
        match self.lifespan {
            Some(lifespan) => lifespan,
            None => current_cycle.saturating_sub(self.birth_cycle),
        }
    }

    /// Pays this cycle's operating cost. Returns true when the business is now insolvent.
    pub fn burn(&mut self, burn_rate: f64) -> bool {
        self.cash -= burn_rate;
        self.cash < 0.0
    }

    pub(crate) fn die(&mut self, cycle: u64) {
        if self.death_cycle.is_some() {
            return;
        }
        self.death_cycle = Some(cycle);
        self.lifespan = Some(cycle.saturating_sub(self.birth_cycle));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessLocation {
    pub id: LocationId,
    pub position: Point,
    occupant: Option<BusinessId>,
}

impl BusinessLocation {
    pub fn new(id: LocationId, position: Point) -> Self {
        Self {
            id,
            position,
            occupant: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn occupant(&self) -> Option<BusinessId> {
        self.occupant
    }

    pub(crate) fn fill(&mut self, business: BusinessId) {
        self.occupant = Some(business);
    }

    pub(crate) fn free(&mut self) {
        self.occupant = None;
    }
}
