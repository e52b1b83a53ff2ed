//! Purchase header, lines and lot associations

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use shared::models::PaymentStatus;

/// Stored purchase header
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Purchase {
    #[sqlx(rename = "id_compra")]
    pub id: i64,
    #[sqlx(rename = "id_proveedor")]
    pub supplier_id: i64,
    #[sqlx(rename = "nro_factura")]
    pub invoice_number: String,
    #[sqlx(rename = "fecha_emision")]
    pub issue_date: NaiveDate,
    #[sqlx(rename = "dias_plazo")]
    pub payment_term_days: i32,
    #[sqlx(rename = "fecha_vencimiento")]
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    #[sqlx(rename = "porcentaje_descuento")]
    pub discount_percent: Decimal,
    #[sqlx(rename = "monto_descuento")]
    pub discount_amount: Decimal,
    #[sqlx(rename = "monto_cargos")]
    pub surcharge_amount: Decimal,
    pub total: Decimal,
    #[sqlx(rename = "monto_abonado")]
    pub amount_paid: Decimal,
    #[sqlx(rename = "estado_pago")]
    pub payment_status: String,
    #[sqlx(rename = "id_usuario")]
    pub user_id: Option<i64>,
}

/// Purchase header to insert
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub supplier_id: i64,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub payment_term_days: i32,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub surcharge_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub user_id: Option<i64>,
}

/// Stored purchase line
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PurchaseLine {
    #[sqlx(rename = "id_detalle")]
    pub id: i64,
    #[sqlx(rename = "id_compra")]
    pub purchase_id: i64,
    #[sqlx(rename = "id_inventario")]
    pub inventory_id: i64,
    #[sqlx(rename = "descripcion")]
    pub description: Option<String>,
    #[sqlx(rename = "cantidad")]
    pub quantity: i32,
    #[sqlx(rename = "costo_base")]
    pub base_cost: Decimal,
    #[sqlx(rename = "descuento_unitario")]
    pub unit_discount: Decimal,
    #[sqlx(rename = "cargo_unitario")]
    pub unit_surcharge: Decimal,
    #[sqlx(rename = "costo_final")]
    pub final_unit_cost: Decimal,
    #[sqlx(rename = "subtotal_linea")]
    pub line_subtotal: Decimal,
}

/// Purchase line to insert
#[derive(Debug, Clone)]
pub struct NewPurchaseLine {
    pub purchase_id: i64,
    pub inventory_id: i64,
    pub description: Option<String>,
    pub quantity: i32,
    pub base_cost: Decimal,
    pub unit_discount: Decimal,
    pub unit_surcharge: Decimal,
    pub final_unit_cost: Decimal,
    pub line_subtotal: Decimal,
}

/// Association of a purchase line with a lot it fed
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PurchaseLineLot {
    #[sqlx(rename = "id_detalle_lote")]
    pub id: i64,
    #[sqlx(rename = "id_detalle")]
    pub line_id: i64,
    #[sqlx(rename = "id_lote")]
    pub lot_id: i64,
    #[sqlx(rename = "cantidad")]
    pub quantity: i32,
    #[sqlx(rename = "fecha_vencimiento")]
    pub expires_on: Option<NaiveDate>,
}

/// Line/lot association to insert
#[derive(Debug, Clone)]
pub struct NewPurchaseLineLot {
    pub line_id: i64,
    pub lot_id: i64,
    pub quantity: i32,
    pub expires_on: Option<NaiveDate>,
}
