//! Repository for the `earthquakes` table.

use seismo_core::types::DbId;
use sqlx::PgPool;

use crate::models::earthquake::{CreateEarthquake, Earthquake, EarthquakeSummary};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, usgs_id, place, magnitude, time, created_at, updated_at";

/// Lookup and insert operations for earthquakes.
pub struct EarthquakeRepo;

impl EarthquakeRepo {
    /// Insert a new earthquake, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateEarthquake) -> Result<Earthquake, sqlx::Error> {
        let query = format!(
            "INSERT INTO earthquakes (usgs_id, place, magnitude, time)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Earthquake>(&query)
            .bind(&input.usgs_id)
            .bind(&input.place)
            .bind(input.magnitude)
            .bind(input.time)
            .fetch_one(pool)
            .await
    }

    /// Find the summary of an earthquake by its internal ID.
    pub async fn find_summary(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<EarthquakeSummary>, sqlx::Error> {
        sqlx::query_as::<_, EarthquakeSummary>(
            "SELECT id, usgs_id, place, magnitude FROM earthquakes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
