//! Earthquake entity models.
//!
//! Earthquakes are synced from the upstream seismic feed elsewhere; the
//! pipeline only needs to look them up and summarise them.

use seismo_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `earthquakes` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Earthquake {
    pub id: DbId,
    /// Identifier assigned by the upstream feed.
    pub usgs_id: String,
    pub place: String,
    pub magnitude: f64,
    pub time: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an earthquake.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEarthquake {
    pub usgs_id: String,
    pub place: String,
    pub magnitude: f64,
    pub time: Timestamp,
}

/// Parent summary embedded in single-image responses.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct EarthquakeSummary {
    pub id: DbId,
    pub usgs_id: String,
    pub place: String,
    pub magnitude: f64,
}

impl From<&Earthquake> for EarthquakeSummary {
    fn from(eq: &Earthquake) -> Self {
        Self {
            id: eq.id,
            usgs_id: eq.usgs_id.clone(),
            place: eq.place.clone(),
            magnitude: eq.magnitude,
        }
    }
}
