//! Purchase intake payload
//!
//! Field names on the wire follow the clinic front end (`nro_factura`,
//! `Costo_Ficha`, ...); the Rust names are the English equivalents.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::money::Amount;

/// A purchase invoice to register
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseIntakeRequest {
    #[serde(rename = "id_proveedor")]
    pub supplier_id: i64,

    #[serde(rename = "nro_factura")]
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: String,

    #[serde(rename = "fecha_emision")]
    pub issue_date: NaiveDate,

    #[serde(rename = "dias_plazo", default)]
    #[validate(range(min = 0, max = 3650))]
    pub payment_term_days: i32,

    #[serde(rename = "fecha_vencimiento", default)]
    pub due_date: Option<NaiveDate>,

    #[serde(rename = "id_usuario", default)]
    pub user_id: Option<i64>,

    #[validate(length(min = 1))]
    pub items: Vec<IntakeItem>,

    #[serde(rename = "detalle_lotes", default)]
    pub lot_allocations: Vec<LotAllocation>,

    #[serde(rename = "totales_cargos", default)]
    pub totals: ChargeTotals,
}

/// One invoice line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IntakeItem {
    #[serde(rename = "id_producto")]
    pub product_id: i64,

    /// Description snapshot shown on the invoice
    #[serde(rename = "Producto", default)]
    pub description: Option<String>,

    #[serde(rename = "Cant")]
    #[validate(range(min = 1))]
    pub quantity: i32,

    #[serde(rename = "Costo_Base", default)]
    pub base_cost: Option<Amount>,

    #[serde(rename = "Descuento_Unitario", default)]
    pub unit_discount: Option<Amount>,

    #[serde(rename = "Cargo_Unitario", default)]
    pub unit_surcharge: Option<Amount>,

    /// Final unit cost after discounts and surcharges
    #[serde(rename = "Costo_Ficha", default)]
    pub final_unit_cost: Option<Amount>,

    #[serde(rename = "Subtotal_Linea", default)]
    pub line_subtotal: Option<Amount>,
}

/// Portion of a product's received quantity assigned to a lot in a deposit
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LotAllocation {
    #[serde(rename = "id_producto")]
    pub product_id: i64,

    #[serde(rename = "nro_lote")]
    #[validate(length(min = 1, max = 60))]
    pub lot_number: String,

    #[serde(rename = "id_deposito", default)]
    pub deposit_id: Option<i64>,

    #[serde(rename = "cantidad")]
    #[validate(range(min = 1))]
    pub quantity: i32,

    #[serde(rename = "fecha_vencimiento", default)]
    pub expires_on: Option<NaiveDate>,
}

/// Invoice-level totals and charges as typed by the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargeTotals {
    #[serde(default)]
    pub subtotal: Option<Amount>,

    #[serde(rename = "porcentaje_descuento_global", default)]
    pub discount_percent: Option<Amount>,

    #[serde(rename = "monto_descuento_fijo", default)]
    pub fixed_discount: Option<Amount>,

    #[serde(rename = "cargos_monto", default)]
    pub surcharge_amount: Option<Amount>,

    #[serde(default)]
    pub total: Option<Amount>,

    #[serde(rename = "monto_abonado", default)]
    pub amount_paid: Option<Amount>,
}

/// Payment state of a purchase header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Paid => "PAID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "id_proveedor": 3,
        "nro_factura": "FAC-001",
        "fecha_emision": "2024-03-01",
        "dias_plazo": 30,
        "id_usuario": 7,
        "items": [{
            "id_producto": 5,
            "Producto": "Guantes de nitrilo",
            "Cant": 10,
            "Costo_Base": "110,00",
            "Descuento_Unitario": "10,00",
            "Cargo_Unitario": 0,
            "Costo_Ficha": "100,00",
            "Subtotal_Linea": "1.000,00"
        }],
        "detalle_lotes": [{
            "id_producto": 5,
            "nro_lote": "L1",
            "id_deposito": 2,
            "cantidad": 10,
            "fecha_vencimiento": "2026-01-31"
        }],
        "totales_cargos": {
            "subtotal": "1.000,00",
            "porcentaje_descuento_global": 0,
            "monto_descuento_fijo": 0,
            "cargos_monto": 0,
            "total": "1.000,00",
            "monto_abonado": 0
        }
    }"#;

    #[test]
    fn test_deserialize_wire_payload() {
        let request: PurchaseIntakeRequest = serde_json::from_str(PAYLOAD).unwrap();

        assert_eq!(request.supplier_id, 3);
        assert_eq!(request.invoice_number, "FAC-001");
        assert_eq!(request.due_date, None);
        assert_eq!(request.items[0].quantity, 10);
        assert_eq!(
            request.items[0].final_unit_cost,
            Some(Amount::Text("100,00".to_string()))
        );
        assert_eq!(request.lot_allocations[0].deposit_id, Some(2));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_items_fail_validation() {
        let mut request: PurchaseIntakeRequest = serde_json::from_str(PAYLOAD).unwrap();
        request.items.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_payment_status_tags() {
        assert_eq!(PaymentStatus::Pending.as_str(), "PENDING");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"PAID\""
        );
    }
}
