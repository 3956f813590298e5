use thiserror::Error;

use crate::components::{BusinessId, LocationId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("config error: {0}")]
    Config(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("unknown {kind} type id {id}")]
    Lookup { kind: &'static str, id: u16 },

    #[error("business location {0:?} is already occupied")]
    LocationOccupied(LocationId),

    #[error("no business location {0:?} in this city")]
    UnknownLocation(LocationId),

    #[error("business {0:?} is not active")]
    InactiveBusiness(BusinessId),
}

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Config(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        SimError::Geometry(msg.into())
    }
}
