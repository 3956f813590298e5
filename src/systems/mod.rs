mod billing;
mod demand;
mod fulfillment;
mod startup;

pub use billing::BillingSystem;
pub use demand::DemandSystem;
pub use fulfillment::FulfillmentSystem;
pub use startup::StartupSystem;
