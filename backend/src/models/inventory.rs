//! Inventory, lot and per-deposit stock records

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Aggregate stock record of a product (one per product)
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct InventoryRecord {
    #[sqlx(rename = "id_inventario")]
    pub id: i64,
    #[sqlx(rename = "id_producto")]
    pub product_id: i64,
    pub sku: Option<String>,
    #[sqlx(rename = "existencia_general")]
    pub quantity: i32,
    #[sqlx(rename = "costo_unitario")]
    pub unit_cost: Decimal,
    #[sqlx(rename = "precio_venta")]
    pub sale_price: Decimal,
    #[sqlx(rename = "margen_ganancia")]
    pub margin: Decimal,
    #[sqlx(rename = "stock_minimo_general")]
    pub min_stock: i32,
}

impl InventoryRecord {
    /// The monitored pricing fields
    pub fn price_snapshot(&self) -> PriceSnapshot {
        PriceSnapshot {
            cost: self.unit_cost,
            margin: self.margin,
            price: self.sale_price,
        }
    }
}

/// Cost/margin/price triple compared by the audit writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(rename = "costo_unitario")]
    pub cost: Decimal,
    #[serde(rename = "margen_ganancia")]
    pub margin: Decimal,
    #[serde(rename = "precio_venta")]
    pub price: Decimal,
}

/// Natural key of a lot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LotKey {
    pub product_id: i64,
    pub deposit_id: i64,
    pub lot_number: String,
}

/// A tracked batch of a product inside one deposit
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Lot {
    #[sqlx(rename = "id_lote")]
    pub id: i64,
    #[sqlx(rename = "id_producto")]
    pub product_id: i64,
    #[sqlx(rename = "id_deposito")]
    pub deposit_id: i64,
    #[sqlx(rename = "nro_lote")]
    pub lot_number: String,
    #[sqlx(rename = "cantidad")]
    pub quantity: i32,
    #[sqlx(rename = "fecha_vencimiento")]
    pub expires_on: Option<NaiveDate>,
}

impl Lot {
    pub fn key(&self) -> LotKey {
        LotKey {
            product_id: self.product_id,
            deposit_id: self.deposit_id,
            lot_number: self.lot_number.clone(),
        }
    }
}

/// Stock counter of a product in one deposit
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DepositStock {
    #[sqlx(rename = "id_stock")]
    pub id: i64,
    #[sqlx(rename = "id_producto")]
    pub product_id: i64,
    #[sqlx(rename = "id_deposito")]
    pub deposit_id: i64,
    #[sqlx(rename = "cantidad")]
    pub quantity: i32,
    #[sqlx(rename = "stock_minimo")]
    pub min_stock: i32,
}

/// Result of an upsert: the stored row and whether it was newly inserted
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub record: T,
    pub created: bool,
}
