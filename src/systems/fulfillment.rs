use crate::{
    engine::{System, SystemContext},
    error::SimError,
    rng::SystemRng,
    world::World,
};

/// People spend their accumulated need at a random business within reach.
pub struct FulfillmentSystem;

impl FulfillmentSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FulfillmentSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for FulfillmentSystem {
    fn name(&self) -> &str {
        "fulfillment"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<(), SimError> {
        let market = world.market_view();
        if market.is_empty() {
            return Ok(());
        }

        let demand_types = world.registry.demand_types();
        let mut transactions = Vec::new();
        for person in world.people.iter_mut() {
            transactions.extend(person.fulfill(&market, demand_types, ctx.payment_mode, rng));
        }

        for transaction in &transactions {
            let business = world
                .businesses
                .get_mut(&transaction.business)
                .ok_or(SimError::InactiveBusiness(transaction.business))?;
            business.cash += transaction.amount;
        }
        world.events.transactions += transactions.len();
        Ok(())
    }
}
