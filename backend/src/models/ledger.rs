//! Kardex and audit trail records (append-only)

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

use shared::models::{AuditAction, MovementType};

use super::PriceSnapshot;

/// Stored kardex entry
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct KardexEntry {
    #[sqlx(rename = "id_kardex")]
    pub id: i64,
    #[sqlx(rename = "id_producto")]
    pub product_id: i64,
    #[sqlx(rename = "fecha")]
    pub movement_date: NaiveDate,
    #[sqlx(rename = "cantidad_inicial")]
    pub opening_quantity: i32,
    #[sqlx(rename = "cantidad_entrada")]
    pub quantity_in: i32,
    #[sqlx(rename = "cantidad_salida")]
    pub quantity_out: i32,
    #[sqlx(rename = "cantidad_final")]
    pub closing_quantity: i32,
    #[sqlx(rename = "costo_unitario")]
    pub unit_cost: Decimal,
    #[sqlx(rename = "precio_unitario")]
    pub unit_price: Decimal,
    #[sqlx(rename = "detalle")]
    pub detail: String,
    #[sqlx(rename = "nro_documento")]
    pub document_number: Option<String>,
    #[sqlx(rename = "tipo_movimiento")]
    pub movement_type: String,
}

/// Kardex entry to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewKardexEntry {
    pub product_id: i64,
    pub movement_date: NaiveDate,
    pub opening_quantity: i32,
    pub quantity_in: i32,
    pub quantity_out: i32,
    pub closing_quantity: i32,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
    pub detail: String,
    pub document_number: Option<String>,
    pub movement_type: MovementType,
}

/// Stored audit entry
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AuditEntry {
    #[sqlx(rename = "id_auditoria")]
    pub id: i64,
    #[sqlx(rename = "entidad")]
    pub entity: String,
    #[sqlx(rename = "id_entidad")]
    pub entity_id: i64,
    #[sqlx(rename = "accion")]
    pub action: String,
    #[sqlx(rename = "valores_anteriores")]
    pub previous: Option<Json<PriceSnapshot>>,
    #[sqlx(rename = "valores_nuevos")]
    pub current: Option<Json<PriceSnapshot>>,
    #[sqlx(rename = "id_usuario")]
    pub user_id: Option<i64>,
    #[sqlx(rename = "fecha")]
    pub recorded_at: DateTime<Utc>,
}

/// Audit entry to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub entity: &'static str,
    pub entity_id: i64,
    pub action: AuditAction,
    pub previous: Option<PriceSnapshot>,
    pub current: Option<PriceSnapshot>,
    pub user_id: Option<i64>,
}
