//! Repository for the append-only `audit_logs` table.

use seismo_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit::{AuditLog, CreateAuditLog};

const COLUMNS: &str =
    "id, earthquake_id, image_id, action, entity_type, entity_id, changes, created_at";

/// Insert and query operations for audit logs. There is no update or delete.
pub struct AuditRepo;

impl AuditRepo {
    /// Append one audit entry.
    pub async fn insert(pool: &PgPool, input: &CreateAuditLog) -> Result<AuditLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs (earthquake_id, image_id, action, entity_type, entity_id, changes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(input.earthquake_id)
            .bind(input.image_id)
            .bind(input.action)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.changes)
            .fetch_one(pool)
            .await
    }

    /// All entries for one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuditLog>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
