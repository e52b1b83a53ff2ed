//! Purchase intake orchestration
//!
//! Registering an invoice touches the purchase header and lines, the inventory
//! record of every product, its lots and per-deposit counters, the kardex and
//! the audit trail. All of it runs on one transaction: the payload is fully
//! normalised first, then applied line by line, then committed. Any failure
//! rolls the whole invoice back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use validator::Validate;

use shared::models::{AuditAction, PaymentStatus, PurchaseIntakeRequest};
use shared::money::{parse_amount, parse_optional_amount, Amount};
use shared::pricing::{amounts_agree, derive_due_date, derive_sale_price, round_money, InvoiceTotals};
use shared::validation::{
    validate_discount_percent, validate_invoice_number, validate_lot_coverage,
    validate_lot_number, validate_money_range, validate_sale_price, validate_unit_cost,
};

use crate::db::{finish, with_deadline, Store, StoreTx};
use crate::error::{AppError, AppResult};
use crate::models::{LotKey, NewPurchase, NewPurchaseLine, NewPurchaseLineLot};
use crate::services::audit::{record_price_change, AuditSubject};
use crate::services::kardex::{record_movement, StockMovement};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Purchase intake service
#[derive(Clone)]
pub struct PurchaseIntakeService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// Result of a committed intake
#[derive(Debug, Clone, Serialize)]
pub struct IntakeReceipt {
    pub purchase_id: i64,
    pub invoice_number: String,
    pub due_date: NaiveDate,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub lines: Vec<LineOutcome>,
    pub lots: Vec<LotOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineOutcome {
    pub line_id: i64,
    pub product_id: i64,
    pub inventory_id: i64,
    pub quantity: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub unit_cost: Decimal,
    pub sale_price: Decimal,
    /// Whether the line changed cost or price and wrote an audit entry
    pub audited: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LotOutcome {
    pub lot_id: i64,
    pub product_id: i64,
    pub deposit_id: i64,
    pub lot_number: String,
    pub quantity: i32,
    /// False when the quantity was added to an existing lot
    pub created: bool,
}

/// Intake with every amount parsed and every cross-field rule checked
#[derive(Debug, Clone)]
struct NormalizedIntake {
    header: NewPurchase,
    lines: Vec<NormalizedLine>,
    allocations: HashMap<i64, Vec<NormalizedAllocation>>,
}

#[derive(Debug, Clone)]
struct NormalizedLine {
    product_id: i64,
    description: Option<String>,
    quantity: i32,
    base_cost: Decimal,
    unit_discount: Decimal,
    unit_surcharge: Decimal,
    final_unit_cost: Decimal,
    line_subtotal: Decimal,
}

#[derive(Debug, Clone)]
struct NormalizedAllocation {
    key: LotKey,
    quantity: i32,
    expires_on: Option<NaiveDate>,
}

impl PurchaseIntakeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the duration of each intake transaction
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a purchase invoice and apply its stock and cost effects
    pub async fn register(&self, request: PurchaseIntakeRequest) -> AppResult<IntakeReceipt> {
        let intake = normalize(&request)?;

        let mut tx = self.store.begin().await?;
        let result = with_deadline(self.timeout, apply_intake(tx.as_mut(), &intake)).await;
        let receipt = finish(tx, result).await.map_err(|err| {
            warn!(
                "Intake of invoice {} rolled back: {}",
                intake.header.invoice_number,
                err.code()
            );
            err
        })?;

        info!(
            "Registered invoice {} as purchase {} ({} lines, {} lots)",
            receipt.invoice_number,
            receipt.purchase_id,
            receipt.lines.len(),
            receipt.lots.len()
        );

        Ok(receipt)
    }
}

fn money(field: &str, value: Option<&Amount>) -> AppResult<Decimal> {
    in_range(field, round_money(parse_amount(field, value)?))
}

fn optional_money(field: &str, value: Option<&Amount>) -> AppResult<Option<Decimal>> {
    parse_optional_amount(field, value)?
        .map(|amount| in_range(field, round_money(amount)))
        .transpose()
}

fn in_range(field: &str, amount: Decimal) -> AppResult<Decimal> {
    validate_money_range(amount).map_err(|_| AppError::amount_out_of_range(field))?;
    Ok(amount)
}

fn normalize(request: &PurchaseIntakeRequest) -> AppResult<NormalizedIntake> {
    request.validate()?;
    validate_invoice_number(&request.invoice_number)
        .map_err(|e| AppError::validation("nro_factura", e))?;

    let mut lines = Vec::with_capacity(request.items.len());
    for (index, item) in request.items.iter().enumerate() {
        item.validate()?;

        let field = |name: &str| format!("items[{}].{}", index, name);
        let base_cost = money(&field("Costo_Base"), item.base_cost.as_ref())?;
        let unit_discount = money(&field("Descuento_Unitario"), item.unit_discount.as_ref())?;
        let unit_surcharge = money(&field("Cargo_Unitario"), item.unit_surcharge.as_ref())?;
        let final_unit_cost = optional_money(&field("Costo_Ficha"), item.final_unit_cost.as_ref())?
            .unwrap_or(base_cost - unit_discount + unit_surcharge);
        validate_unit_cost(final_unit_cost)
            .map_err(|e| AppError::validation(&field("Costo_Ficha"), e))?;

        let line_subtotal =
            match optional_money(&field("Subtotal_Linea"), item.line_subtotal.as_ref())? {
            Some(subtotal) => subtotal,
            None => {
                let product = final_unit_cost
                    .checked_mul(Decimal::from(item.quantity))
                    .ok_or_else(|| AppError::amount_out_of_range(&field("Subtotal_Linea")))?;
                in_range(&field("Subtotal_Linea"), round_money(product))?
            }
        };

        lines.push(NormalizedLine {
            product_id: item.product_id,
            description: item.description.clone(),
            quantity: item.quantity,
            base_cost,
            unit_discount,
            unit_surcharge,
            final_unit_cost,
            line_subtotal,
        });
    }

    let charges = &request.totals;
    let discount_percent = parse_amount(
        "totales_cargos.porcentaje_descuento_global",
        charges.discount_percent.as_ref(),
    )?;
    validate_discount_percent(discount_percent)
        .map_err(|e| AppError::validation("totales_cargos.porcentaje_descuento_global", e))?;
    let fixed_discount = money(
        "totales_cargos.monto_descuento_fijo",
        charges.fixed_discount.as_ref(),
    )?;
    let surcharge = money("totales_cargos.cargos_monto", charges.surcharge_amount.as_ref())?;
    let amount_paid = money("totales_cargos.monto_abonado", charges.amount_paid.as_ref())?;

    let totals = InvoiceTotals::derive(
        lines.iter().map(|l| l.line_subtotal),
        discount_percent,
        fixed_discount,
        surcharge,
    )
    .ok_or_else(|| AppError::amount_out_of_range("totales_cargos.total"))?;
    in_range("totales_cargos.subtotal", totals.subtotal)?;
    in_range("totales_cargos.total", totals.total)?;
    check_total("subtotal", charges.subtotal.as_ref(), totals.subtotal)?;
    check_total("total", charges.total.as_ref(), totals.total)?;

    let allocations = group_allocations(request, &lines)?;

    let header = NewPurchase {
        supplier_id: request.supplier_id,
        invoice_number: request.invoice_number.clone(),
        issue_date: request.issue_date,
        payment_term_days: request.payment_term_days,
        due_date: derive_due_date(
            request.issue_date,
            request.payment_term_days,
            request.due_date,
        ),
        subtotal: totals.subtotal,
        discount_percent: totals.discount_percent,
        discount_amount: totals.discount_amount,
        surcharge_amount: totals.surcharge_amount,
        total: totals.total,
        amount_paid,
        payment_status: PaymentStatus::Pending,
        user_id: request.user_id,
    };

    Ok(NormalizedIntake {
        header,
        lines,
        allocations,
    })
}

fn check_total(name: &str, supplied: Option<&Amount>, derived: Decimal) -> AppResult<()> {
    let field = format!("totales_cargos.{}", name);
    match optional_money(&field, supplied)? {
        Some(value) if !amounts_agree(value, derived) => Err(AppError::invalid(
            &field,
            "TOTAL_MISMATCH",
            format!("supplied {} does not match the lines ({})", value, derived),
        )),
        _ => Ok(()),
    }
}

/// Group allocations by product, preserving input order within each product
fn group_allocations(
    request: &PurchaseIntakeRequest,
    lines: &[NormalizedLine],
) -> AppResult<HashMap<i64, Vec<NormalizedAllocation>>> {
    let mut received: HashMap<i64, i64> = HashMap::new();
    for line in lines {
        *received.entry(line.product_id).or_default() += i64::from(line.quantity);
    }

    let mut grouped: HashMap<i64, Vec<NormalizedAllocation>> = HashMap::new();
    for (index, allocation) in request.lot_allocations.iter().enumerate() {
        allocation.validate()?;
        let field = |name: &str| format!("detalle_lotes[{}].{}", index, name);

        validate_lot_number(&allocation.lot_number)
            .map_err(|e| AppError::validation(&field("nro_lote"), e))?;

        if !received.contains_key(&allocation.product_id) {
            return Err(AppError::invalid(
                &field("id_producto"),
                "LOT_WITHOUT_LINE",
                format!("product {} has no invoice line", allocation.product_id),
            ));
        }

        let deposit_id = allocation.deposit_id.ok_or_else(|| {
            AppError::invalid(
                &field("id_deposito"),
                "MISSING_DEPOSIT",
                format!("lot {} has no deposit", allocation.lot_number),
            )
        })?;

        grouped
            .entry(allocation.product_id)
            .or_default()
            .push(NormalizedAllocation {
                key: LotKey {
                    product_id: allocation.product_id,
                    deposit_id,
                    lot_number: allocation.lot_number.clone(),
                },
                quantity: allocation.quantity,
                expires_on: allocation.expires_on,
            });
    }

    for (product_id, allocations) in &grouped {
        let allocated: i64 = allocations.iter().map(|a| i64::from(a.quantity)).sum();
        let expected = received.get(product_id).copied().unwrap_or_default();
        validate_lot_coverage(expected, allocated).map_err(|e| {
            AppError::invalid(
                "detalle_lotes",
                "LOT_QUANTITY_MISMATCH",
                format!("product {}: {} ({} received, {} allocated)", product_id, e, expected, allocated),
            )
        })?;
    }

    Ok(grouped)
}

/// Apply a normalised intake on an open transaction
async fn apply_intake(tx: &mut dyn StoreTx, intake: &NormalizedIntake) -> AppResult<IntakeReceipt> {
    let header = tx.insert_purchase(&intake.header).await?;
    debug!(
        "Inserted purchase {} for invoice {}",
        header.id, header.invoice_number
    );

    let mut lines = Vec::with_capacity(intake.lines.len());
    let mut lots = Vec::new();
    let mut allocated_products: Vec<i64> = Vec::new();

    for line in &intake.lines {
        let before = tx.lock_by_product(line.product_id).await?.ok_or_else(|| {
            AppError::not_found(
                "PRODUCT_NOT_FOUND",
                format!("Product {} has no inventory record", line.product_id),
            )
        })?;

        let sale_price = derive_sale_price(line.final_unit_cost, before.margin)
            .filter(|price| validate_sale_price(*price).is_ok())
            .ok_or_else(|| AppError::amount_out_of_range("precio_venta"))?;
        let after = tx
            .apply_receipt(before.id, line.final_unit_cost, sale_price, line.quantity)
            .await?;

        let audit = record_price_change(
            tx,
            AuditSubject::inventory(
                after.id,
                AuditAction::PurchaseIntake,
                intake.header.user_id,
            ),
            &before.price_snapshot(),
            &after.price_snapshot(),
        )
        .await?;

        record_movement(
            tx,
            &StockMovement::purchase(
                line.product_id,
                before.quantity,
                line.quantity,
                line.final_unit_cost,
                sale_price,
                &header.invoice_number,
            ),
        )
        .await?;

        let stored_line = tx
            .insert_purchase_line(&NewPurchaseLine {
                purchase_id: header.id,
                inventory_id: after.id,
                description: line.description.clone(),
                quantity: line.quantity,
                base_cost: line.base_cost,
                unit_discount: line.unit_discount,
                unit_surcharge: line.unit_surcharge,
                final_unit_cost: line.final_unit_cost,
                line_subtotal: line.line_subtotal,
            })
            .await?;

        if !allocated_products.contains(&line.product_id) {
            allocated_products.push(line.product_id);
            match intake.allocations.get(&line.product_id) {
                Some(allocations) => {
                    for allocation in allocations {
                        lots.push(apply_allocation(tx, stored_line.id, allocation).await?);
                    }
                }
                None => warn!(
                    "Product {} received on invoice {} without lot allocation",
                    line.product_id, header.invoice_number
                ),
            }
        }

        lines.push(LineOutcome {
            line_id: stored_line.id,
            product_id: line.product_id,
            inventory_id: after.id,
            quantity: line.quantity,
            quantity_before: before.quantity,
            quantity_after: after.quantity,
            unit_cost: after.unit_cost,
            sale_price: after.sale_price,
            audited: audit.is_some(),
        });
    }

    Ok(IntakeReceipt {
        purchase_id: header.id,
        invoice_number: header.invoice_number,
        due_date: header.due_date,
        subtotal: header.subtotal,
        discount_amount: header.discount_amount,
        total: header.total,
        lines,
        lots,
    })
}

async fn apply_allocation(
    tx: &mut dyn StoreTx,
    line_id: i64,
    allocation: &NormalizedAllocation,
) -> AppResult<LotOutcome> {
    let key = &allocation.key;
    if !tx.deposit_exists(key.deposit_id).await? {
        return Err(AppError::not_found(
            "DEPOSIT_NOT_FOUND",
            format!("Deposit {} does not exist", key.deposit_id),
        ));
    }

    let lot = tx
        .upsert_lot(key, allocation.quantity, allocation.expires_on)
        .await?;
    let stock = tx
        .upsert_deposit_stock(key.product_id, key.deposit_id, allocation.quantity)
        .await?;

    tx.insert_line_lot(&NewPurchaseLineLot {
        line_id,
        lot_id: lot.record.id,
        quantity: allocation.quantity,
        expires_on: allocation.expires_on,
    })
    .await?;

    debug!(
        "Lot {} of product {} in deposit {} now holds {} (deposit total {})",
        key.lot_number, key.product_id, key.deposit_id, lot.record.quantity, stock.record.quantity
    );

    Ok(LotOutcome {
        lot_id: lot.record.id,
        product_id: key.product_id,
        deposit_id: key.deposit_id,
        lot_number: key.lot_number.clone(),
        quantity: allocation.quantity,
        created: lot.created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> PurchaseIntakeRequest {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> serde_json::Value {
        json!({
            "id_proveedor": 3,
            "nro_factura": "FAC-001",
            "fecha_emision": "2024-03-01",
            "dias_plazo": 30,
            "items": [
                { "id_producto": 5, "Cant": 6, "Costo_Ficha": "100,00" },
                { "id_producto": 5, "Cant": 4, "Costo_Ficha": 100 }
            ],
            "detalle_lotes": [
                { "id_producto": 5, "nro_lote": "L1", "id_deposito": 2, "cantidad": 10 }
            ],
            "totales_cargos": { "subtotal": "1.000,00", "total": "1.000,00" }
        })
    }

    #[test]
    fn test_normalize_defaults() {
        let intake = normalize(&request(base())).unwrap();

        assert_eq!(intake.header.subtotal, Decimal::from(1000));
        assert_eq!(intake.header.payment_status, PaymentStatus::Pending);
        assert_eq!(
            intake.header.due_date,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        );
        assert_eq!(intake.lines[0].line_subtotal, Decimal::from(600));
        assert_eq!(intake.allocations[&5].len(), 1);
    }

    #[test]
    fn test_final_cost_falls_back_to_components() {
        let mut payload = base();
        payload["items"] = json!([{
            "id_producto": 5, "Cant": 10,
            "Costo_Base": "110,00", "Descuento_Unitario": "15,00", "Cargo_Unitario": "5,00"
        }]);

        let intake = normalize(&request(payload)).unwrap();
        assert_eq!(intake.lines[0].final_unit_cost, Decimal::from(100));
    }

    #[test]
    fn test_total_mismatch() {
        let mut payload = base();
        payload["totales_cargos"]["total"] = json!("999,00");

        let err = normalize(&request(payload)).unwrap_err();
        assert_eq!(err.code(), "TOTAL_MISMATCH");
    }

    #[test]
    fn test_malformed_amount_names_the_field() {
        let mut payload = base();
        payload["items"][1]["Costo_Ficha"] = json!("12,3,4");

        match normalize(&request(payload)).unwrap_err() {
            AppError::Validation { field, code, .. } => {
                assert_eq!(field, "items[1].Costo_Ficha");
                assert_eq!(code, "INVALID_AMOUNT");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_oversized_amounts_are_rejected() {
        let mut huge_cost = base();
        huge_cost["items"][0]["Costo_Ficha"] = json!("79.228.162.514.264.337.593.543.950.335");
        let err = normalize(&request(huge_cost)).unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");

        // Each cost fits, the line subtotal does not
        let mut huge_line = base();
        huge_line["items"] = json!([{ "id_producto": 5, "Cant": 10, "Costo_Ficha": "500.000.000.000" }]);
        huge_line["totales_cargos"] = json!({});
        match normalize(&request(huge_line)).unwrap_err() {
            AppError::Validation { field, code, .. } => {
                assert_eq!(field, "items[0].Subtotal_Linea");
                assert_eq!(code, "INVALID_AMOUNT");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_allocation_rules() {
        let mut orphan = base();
        orphan["detalle_lotes"][0]["id_producto"] = json!(6);
        assert_eq!(
            normalize(&request(orphan)).unwrap_err().code(),
            "LOT_WITHOUT_LINE"
        );

        let mut no_deposit = base();
        no_deposit["detalle_lotes"][0]
            .as_object_mut()
            .unwrap()
            .remove("id_deposito");
        assert_eq!(
            normalize(&request(no_deposit)).unwrap_err().code(),
            "MISSING_DEPOSIT"
        );

        let mut short = base();
        short["detalle_lotes"][0]["cantidad"] = json!(9);
        assert_eq!(
            normalize(&request(short)).unwrap_err().code(),
            "LOT_QUANTITY_MISMATCH"
        );
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut payload = base();
        payload["items"] = json!([]);
        payload["detalle_lotes"] = json!([]);

        let err = normalize(&request(payload)).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
