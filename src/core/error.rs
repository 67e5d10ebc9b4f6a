use thiserror::Error;

use crate::core::types::UnitId;

/// Fatal data-integrity errors. Everything recoverable (no path, blocked
/// placement, dead order target) is expressed as an empty/`false`/`None`
/// result at the query site instead.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("battlefield dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("unit {0:?} reached the attack phase alive with no weapons and no spells")]
    UnarmedUnit(UnitId),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
