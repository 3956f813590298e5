pub mod city;
pub mod components;
pub mod engine;
pub mod error;
pub mod registry;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod spatial;
pub mod systems;
pub mod world;

pub use city::{City, CityBuilder};
pub use components::PaymentMode;
pub use engine::{CycleSummary, Engine};
pub use error::SimError;
pub use registry::TypeTables;
pub use world::World;
