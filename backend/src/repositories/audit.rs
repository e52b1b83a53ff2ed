//! Audit trail appends

use async_trait::async_trait;
use sqlx::types::Json;

use super::AuditRepository;
use crate::db::PgTx;
use crate::error::AppResult;
use crate::models::{AuditEntry, NewAuditEntry};

#[async_trait]
impl AuditRepository for PgTx {
    async fn append_audit(&mut self, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
        let row = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO auditoria (
                entidad, id_entidad, accion, valores_anteriores, valores_nuevos, id_usuario
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id_auditoria, entidad, id_entidad, accion, valores_anteriores,
                      valores_nuevos, id_usuario, fecha
            "#,
        )
        .bind(entry.entity)
        .bind(entry.entity_id)
        .bind(entry.action.as_str())
        .bind(entry.previous.map(Json))
        .bind(entry.current.map(Json))
        .bind(entry.user_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(row)
    }
}
