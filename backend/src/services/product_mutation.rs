//! Product update and delete orchestration
//!
//! Updates arrive as sparse JSON objects whose keys are matched against the
//! product and inventory column allowlists. Deletes are rejected while the
//! product still holds stock or purchase history, and otherwise remove the
//! empty lot and deposit rows together with the product.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use shared::models::AuditAction;
use shared::pricing::{derive_sale_price, round_money};
use shared::validation::{validate_margin, validate_sale_price, validate_stock_level, validate_unit_cost};

use crate::db::{finish, with_deadline, Store, StoreTx};
use crate::error::{AppError, AppResult};
use crate::models::{InventoryRecord, PriceSnapshot};
use crate::repositories::columns::Column;
use crate::repositories::{ColumnChanges, ColumnValue, InventoryColumn, ProductColumn};
use crate::services::audit::{record_price_change, record_removal, AuditSubject};
use crate::services::kardex::{record_movement, StockMovement};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Keys that steer the update but are not columns
const USER_KEY: &str = "usuario_id";
const PRODUCT_KEY: &str = "id_producto";

/// Product mutation service
#[derive(Clone)]
pub struct ProductMutationService {
    store: Arc<dyn Store>,
    timeout: Duration,
}

/// A validated sparse update
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub user_id: Option<i64>,
    pub product: ColumnChanges<ProductColumn>,
    pub inventory: ColumnChanges<InventoryColumn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductUpdateOutcome {
    pub product_id: i64,
    pub inventory: InventoryRecord,
    pub audited: bool,
    /// Whether the quantity changed and an adjustment was recorded
    pub adjusted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDeletion {
    pub product_id: i64,
    pub inventory_id: Option<i64>,
    pub lots_removed: u64,
    pub deposit_rows_removed: u64,
}

impl ProductUpdate {
    /// Split a payload into product and inventory column sets
    pub fn from_payload(product_id: i64, payload: &Map<String, Value>) -> AppResult<Self> {
        let mut update = ProductUpdate {
            user_id: None,
            product: ColumnChanges::new(),
            inventory: ColumnChanges::new(),
        };

        for (key, value) in payload {
            match key.as_str() {
                USER_KEY => update.user_id = parse_user(value)?,
                PRODUCT_KEY => {
                    if value.as_i64() != Some(product_id) {
                        return Err(AppError::validation(
                            PRODUCT_KEY,
                            "does not match the product in the path",
                        ));
                    }
                }
                field => {
                    if let Some(column) = ProductColumn::from_field(field) {
                        update.product.set(column, column.coerce(value)?);
                    } else if let Some(column) = InventoryColumn::from_field(field) {
                        let value = check_inventory_value(column, column.coerce(value)?)?;
                        update.inventory.set(column, value);
                    } else {
                        return Err(AppError::invalid(
                            field,
                            "UNKNOWN_FIELD",
                            "not an updatable field",
                        ));
                    }
                }
            }
        }

        if update.product.is_empty() && update.inventory.is_empty() {
            return Err(AppError::invalid("payload", "NO_DATA", "nothing to update"));
        }

        Ok(update)
    }

    /// Inventory changes with the sale price re-derived when cost or margin moved alone
    pub fn inventory_changes(
        &self,
        before: &InventoryRecord,
    ) -> AppResult<ColumnChanges<InventoryColumn>> {
        let mut changes = self.inventory.clone();
        let touches_pricing = changes.contains(InventoryColumn::UnitCost)
            || changes.contains(InventoryColumn::Margin);

        if touches_pricing && !changes.contains(InventoryColumn::SalePrice) {
            let cost = decimal_or(&changes, InventoryColumn::UnitCost, before.unit_cost);
            let margin = decimal_or(&changes, InventoryColumn::Margin, before.margin);
            let field = InventoryColumn::SalePrice.name();
            let price = derive_sale_price(cost, margin)
                .filter(|price| validate_sale_price(*price).is_ok())
                .ok_or_else(|| AppError::amount_out_of_range(field))?;
            changes.set(InventoryColumn::SalePrice, ColumnValue::Decimal(price));
        }

        Ok(changes)
    }
}

fn decimal_or(
    changes: &ColumnChanges<InventoryColumn>,
    column: InventoryColumn,
    fallback: rust_decimal::Decimal,
) -> rust_decimal::Decimal {
    changes
        .get(column)
        .and_then(ColumnValue::as_decimal)
        .unwrap_or(fallback)
}

fn parse_user(value: &Value) -> AppResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        other => other
            .as_i64()
            .filter(|id| *id > 0)
            .map(Some)
            .ok_or_else(|| AppError::validation(USER_KEY, "must be a positive integer")),
    }
}

fn check_inventory_value(column: InventoryColumn, value: ColumnValue) -> AppResult<ColumnValue> {
    let field = column.name();
    let value = match value {
        ColumnValue::Decimal(v) => ColumnValue::Decimal(round_money(v)),
        other => other,
    };
    let checked = match (&value, column) {
        (ColumnValue::Int(v), InventoryColumn::Quantity | InventoryColumn::MinStock) => {
            validate_stock_level(*v)
        }
        (ColumnValue::Decimal(v), InventoryColumn::UnitCost) => validate_unit_cost(*v),
        (ColumnValue::Decimal(v), InventoryColumn::SalePrice) => validate_sale_price(*v),
        (ColumnValue::Decimal(v), InventoryColumn::Margin) => validate_margin(*v),
        _ => Ok(()),
    };
    checked.map_err(|e| AppError::validation(field, e))?;

    Ok(value)
}

impl ProductMutationService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply a sparse update to a product and its inventory record
    pub async fn update(
        &self,
        product_id: i64,
        payload: &Map<String, Value>,
    ) -> AppResult<ProductUpdateOutcome> {
        let update = ProductUpdate::from_payload(product_id, payload)?;

        let mut tx = self.store.begin().await?;
        let result = with_deadline(self.timeout, apply_update(tx.as_mut(), product_id, &update)).await;
        let outcome = finish(tx, result).await?;

        info!(
            "Updated product {} (audited: {}, adjusted: {})",
            product_id, outcome.audited, outcome.adjusted
        );
        Ok(outcome)
    }

    /// Delete an empty product; stocked or purchased products are refused
    pub async fn delete(&self, product_id: i64, user_id: Option<i64>) -> AppResult<ProductDeletion> {
        let mut tx = self.store.begin().await?;
        let result = with_deadline(self.timeout, apply_delete(tx.as_mut(), product_id, user_id)).await;
        let deletion = finish(tx, result).await?;

        info!(
            "Deleted product {} ({} lots, {} deposit rows)",
            product_id, deletion.lots_removed, deletion.deposit_rows_removed
        );
        Ok(deletion)
    }
}

fn product_not_found(product_id: i64) -> AppError {
    AppError::not_found("NOT_FOUND", format!("Product {} not found", product_id))
}

async fn apply_update(
    tx: &mut dyn StoreTx,
    product_id: i64,
    update: &ProductUpdate,
) -> AppResult<ProductUpdateOutcome> {
    if !tx.product_exists(product_id).await? {
        return Err(product_not_found(product_id));
    }
    let before = tx.lock_by_product(product_id).await?.ok_or_else(|| {
        AppError::not_found(
            "NOT_FOUND",
            format!("Product {} has no inventory record", product_id),
        )
    })?;

    if !update.product.is_empty() {
        tx.update_product(product_id, &update.product).await?;
    }

    let changes = update.inventory_changes(&before)?;
    let after = if changes.is_empty() {
        before.clone()
    } else {
        tx.update_inventory(before.id, &changes).await?
    };

    let audit = record_price_change(
        tx,
        AuditSubject::inventory(before.id, AuditAction::Update, update.user_id),
        &before.price_snapshot(),
        &after.price_snapshot(),
    )
    .await?;

    let adjusted = after.quantity != before.quantity;
    if adjusted {
        record_movement(
            tx,
            &StockMovement::adjustment(
                product_id,
                before.quantity,
                after.quantity,
                after.unit_cost,
                after.sale_price,
            ),
        )
        .await?;
    }

    Ok(ProductUpdateOutcome {
        product_id,
        inventory: after,
        audited: audit.is_some(),
        adjusted,
    })
}

async fn apply_delete(
    tx: &mut dyn StoreTx,
    product_id: i64,
    user_id: Option<i64>,
) -> AppResult<ProductDeletion> {
    if !tx.product_exists(product_id).await? {
        return Err(product_not_found(product_id));
    }

    let inventory = tx.lock_by_product(product_id).await?;
    let lots = tx.lots_for_product(product_id).await?;
    let deposits = tx.deposit_stock_for_product(product_id).await?;

    let stocked = inventory.as_ref().map(|i| i.quantity > 0).unwrap_or(false)
        || lots.iter().any(|l| l.quantity > 0)
        || deposits.iter().any(|d| d.quantity > 0);
    if stocked {
        return Err(AppError::conflict(
            "PRODUCT_HAS_STOCK",
            format!("Product {} still holds stock", product_id),
        ));
    }

    if let Some(record) = &inventory {
        if tx.count_lines_for_inventory(record.id).await? > 0 {
            return Err(AppError::conflict(
                "PRODUCT_REFERENCED",
                format!("Product {} appears on purchase invoices", product_id),
            ));
        }
    }

    let lots_removed = tx.delete_empty_lots(product_id).await?;
    let deposit_rows_removed = tx.delete_empty_deposit_stock(product_id).await?;
    if let Some(record) = &inventory {
        tx.delete_inventory(record.id).await?;
    }
    if tx.delete_product(product_id).await? == 0 {
        return Err(product_not_found(product_id));
    }

    if let Some(record) = &inventory {
        let last_known: PriceSnapshot = record.price_snapshot();
        record_removal(
            tx,
            AuditSubject::inventory(record.id, AuditAction::Delete, user_id),
            &last_known,
        )
        .await?;
    }

    Ok(ProductDeletion {
        product_id,
        inventory_id: inventory.map(|i| i.id),
        lots_removed,
        deposit_rows_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn record() -> InventoryRecord {
        InventoryRecord {
            id: 1,
            product_id: 5,
            sku: None,
            quantity: 10,
            unit_cost: Decimal::from(100),
            sale_price: Decimal::from(130),
            margin: Decimal::from(30),
            min_stock: 0,
        }
    }

    #[test]
    fn test_split_by_table() {
        let update = ProductUpdate::from_payload(
            5,
            &payload(json!({
                "id_producto": 5,
                "usuario_id": 7,
                "descripcion": "Gasas",
                "stock_minimo_general": 3
            })),
        )
        .unwrap();

        assert_eq!(update.user_id, Some(7));
        assert!(update.product.contains(ProductColumn::Description));
        assert!(update.inventory.contains(InventoryColumn::MinStock));
        assert_eq!(update.inventory.len(), 1);
    }

    #[test]
    fn test_control_keys_alone_are_no_data() {
        let err = ProductUpdate::from_payload(5, &payload(json!({ "usuario_id": 7 }))).unwrap_err();
        assert_eq!(err.code(), "NO_DATA");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProductUpdate::from_payload(5, &payload(json!({ "precio; DROP": 1 }))).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_FIELD");
    }

    #[test]
    fn test_mismatched_product_key_rejected() {
        let err =
            ProductUpdate::from_payload(5, &payload(json!({ "id_producto": 6, "sku": "X" })))
                .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_negative_margin_rejected() {
        let err = ProductUpdate::from_payload(5, &payload(json!({ "margen_ganancia": -1 })))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_cost_change_rederives_price() {
        let update =
            ProductUpdate::from_payload(5, &payload(json!({ "costo_unitario": "200,00" }))).unwrap();
        let changes = update.inventory_changes(&record()).unwrap();

        assert_eq!(
            changes.get(InventoryColumn::SalePrice),
            Some(&ColumnValue::Decimal(Decimal::from(260)))
        );
    }

    #[test]
    fn test_oversized_cost_is_rejected() {
        let err = ProductUpdate::from_payload(
            5,
            &payload(json!({ "costo_unitario": "79.228.162.514.264.337.593.543.950.335" })),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_derived_price_out_of_range_is_rejected() {
        let update = ProductUpdate::from_payload(
            5,
            &payload(json!({ "costo_unitario": "900.000.000.000,00" })),
        )
        .unwrap();
        let err = update.inventory_changes(&record()).unwrap_err();

        assert_eq!(err.code(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_explicit_price_is_kept() {
        let update = ProductUpdate::from_payload(
            5,
            &payload(json!({ "margen_ganancia": 50, "precio_venta": 140 })),
        )
        .unwrap();
        let changes = update.inventory_changes(&record()).unwrap();

        assert_eq!(
            changes.get(InventoryColumn::SalePrice),
            Some(&ColumnValue::Decimal(Decimal::from(140)))
        );
    }
}
