//! In-process store
//!
//! Implements the same repositories as Postgres over plain collections. A
//! transaction holds the store lock for its whole life and edits a private
//! copy of the tables, which replaces the committed state only on `commit`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::error::{AppError, AppResult};
use crate::models::{
    AuditEntry, DepositStock, InventoryRecord, KardexEntry, Lot, LotKey, NewAuditEntry,
    NewKardexEntry, NewPurchase, NewPurchaseLine, NewPurchaseLineLot, Purchase, PurchaseLine,
    PurchaseLineLot, Upserted,
};
use crate::repositories::columns::Column;
use crate::repositories::{
    AuditRepository, ColumnChanges, ColumnValue, DepositStockRepository, InventoryColumn,
    InventoryRepository, KardexRepository, LotRepository, ProductColumn, ProductRepository,
    PurchaseRepository,
};

/// Catalog row of a product
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub id: i64,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
}

/// Initial pricing and stock of a seeded product
#[derive(Debug, Clone)]
pub struct InventorySeed {
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub margin: Decimal,
    pub sale_price: Decimal,
}

impl Default for InventorySeed {
    fn default() -> Self {
        Self {
            quantity: 0,
            unit_cost: Decimal::ZERO,
            margin: Decimal::ZERO,
            sale_price: Decimal::ZERO,
        }
    }
}

/// Every table of the store
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub products: BTreeMap<i64, CatalogProduct>,
    /// Keyed by inventory id
    pub inventory: BTreeMap<i64, InventoryRecord>,
    pub deposits: BTreeSet<i64>,
    pub lots: Vec<Lot>,
    pub deposit_stock: Vec<DepositStock>,
    pub purchases: Vec<Purchase>,
    pub purchase_lines: Vec<PurchaseLine>,
    pub line_lots: Vec<PurchaseLineLot>,
    pub kardex: Vec<KardexEntry>,
    pub audit: Vec<AuditEntry>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn inventory_for(&self, product_id: i64) -> Option<&InventoryRecord> {
        self.inventory.values().find(|r| r.product_id == product_id)
    }

    pub fn lot(&self, product_id: i64, deposit_id: i64, lot_number: &str) -> Option<&Lot> {
        self.lots.iter().find(|l| {
            l.product_id == product_id && l.deposit_id == deposit_id && l.lot_number == lot_number
        })
    }

    pub fn stock_in(&self, product_id: i64, deposit_id: i64) -> Option<&DepositStock> {
        self.deposit_stock
            .iter()
            .find(|s| s.product_id == product_id && s.deposit_id == deposit_id)
    }

    pub fn kardex_for(&self, product_id: i64) -> Vec<&KardexEntry> {
        self.kardex
            .iter()
            .filter(|k| k.product_id == product_id)
            .collect()
    }

    pub fn audit_for(&self, entity: &str, entity_id: i64) -> Vec<&AuditEntry> {
        self.audit
            .iter()
            .filter(|a| a.entity == entity && a.entity_id == entity_id)
            .collect()
    }

    /// Sum of the product's lot quantities
    pub fn lot_total(&self, product_id: i64) -> i64 {
        self.lots
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| i64::from(l.quantity))
            .sum()
    }

    /// Sum of the product's per-deposit quantities
    pub fn deposit_total(&self, product_id: i64) -> i64 {
        self.deposit_stock
            .iter()
            .filter(|s| s.product_id == product_id)
            .map(|s| i64::from(s.quantity))
            .sum()
    }
}

/// Store over in-memory tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product and its inventory record; returns the inventory id
    pub async fn seed_product(&self, product_id: i64, seed: InventorySeed) -> i64 {
        let mut state = self.state.lock().await;
        state.products.insert(
            product_id,
            CatalogProduct {
                id: product_id,
                description: Some(format!("Product {}", product_id)),
                category_id: None,
                brand_id: None,
            },
        );
        let inventory_id = state.next_id();
        state.inventory.insert(
            inventory_id,
            InventoryRecord {
                id: inventory_id,
                product_id,
                sku: None,
                quantity: seed.quantity,
                unit_cost: seed.unit_cost,
                sale_price: seed.sale_price,
                margin: seed.margin,
                min_stock: 0,
            },
        );
        inventory_id
    }

    /// Register a catalog product without an inventory record
    pub async fn seed_bare_product(&self, product_id: i64) {
        let mut state = self.state.lock().await;
        state.products.insert(
            product_id,
            CatalogProduct {
                id: product_id,
                description: None,
                category_id: None,
                brand_id: None,
            },
        );
    }

    pub async fn seed_deposit(&self, deposit_id: i64) {
        self.state.lock().await.deposits.insert(deposit_id);
    }

    /// Copy of the committed tables
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            open: true,
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Open transaction on a [`MemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    open: bool,
}

impl MemoryTx {
    fn state(&mut self) -> AppResult<&mut MemoryState> {
        if self.open {
            Ok(&mut self.working)
        } else {
            Err(AppError::Internal("transaction already closed".to_string()))
        }
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(&mut self) -> AppResult<()> {
        if !self.open {
            return Err(AppError::Internal("transaction already closed".to_string()));
        }
        *self.guard = std::mem::take(&mut self.working);
        self.open = false;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        self.open = false;
        Ok(())
    }
}

fn type_mismatch(column: &str) -> AppError {
    AppError::Internal(format!("value of wrong type for column {}", column))
}

#[async_trait]
impl ProductRepository for MemoryTx {
    async fn product_exists(&mut self, product_id: i64) -> AppResult<bool> {
        Ok(self.state()?.products.contains_key(&product_id))
    }

    async fn update_product(
        &mut self,
        product_id: i64,
        changes: &ColumnChanges<ProductColumn>,
    ) -> AppResult<u64> {
        let Some(product) = self.state()?.products.get_mut(&product_id) else {
            return Ok(0);
        };

        for (column, value) in changes.iter() {
            match (column, value) {
                (ProductColumn::Description, ColumnValue::Text(text)) => {
                    product.description = text.clone()
                }
                (ProductColumn::CategoryId, ColumnValue::BigInt(id)) => {
                    product.category_id = Some(*id)
                }
                (ProductColumn::BrandId, ColumnValue::BigInt(id)) => product.brand_id = Some(*id),
                (column, _) => return Err(type_mismatch(column.name())),
            }
        }
        Ok(1)
    }

    async fn delete_product(&mut self, product_id: i64) -> AppResult<u64> {
        let state = self.state()?;
        if state.inventory.values().any(|r| r.product_id == product_id) {
            return Err(AppError::conflict(
                "PRODUCT_REFERENCED",
                "Product still has an inventory record",
            ));
        }
        Ok(u64::from(state.products.remove(&product_id).is_some()))
    }
}

#[async_trait]
impl InventoryRepository for MemoryTx {
    async fn lock_by_product(&mut self, product_id: i64) -> AppResult<Option<InventoryRecord>> {
        Ok(self.state()?.inventory_for(product_id).cloned())
    }

    async fn apply_receipt(
        &mut self,
        inventory_id: i64,
        unit_cost: Decimal,
        sale_price: Decimal,
        quantity: i32,
    ) -> AppResult<InventoryRecord> {
        let record = self
            .state()?
            .inventory
            .get_mut(&inventory_id)
            .ok_or_else(|| AppError::not_found("NOT_FOUND", "Inventory record not found"))?;

        record.unit_cost = unit_cost;
        record.sale_price = sale_price;
        record.quantity += quantity;
        Ok(record.clone())
    }

    async fn update_inventory(
        &mut self,
        inventory_id: i64,
        changes: &ColumnChanges<InventoryColumn>,
    ) -> AppResult<InventoryRecord> {
        let record = self
            .state()?
            .inventory
            .get_mut(&inventory_id)
            .ok_or_else(|| AppError::not_found("NOT_FOUND", "Inventory record not found"))?;

        for (column, value) in changes.iter() {
            match (column, value) {
                (InventoryColumn::Sku, ColumnValue::Text(text)) => record.sku = text.clone(),
                (InventoryColumn::Quantity, ColumnValue::Int(v)) => record.quantity = *v,
                (InventoryColumn::MinStock, ColumnValue::Int(v)) => record.min_stock = *v,
                (InventoryColumn::UnitCost, ColumnValue::Decimal(v)) => record.unit_cost = *v,
                (InventoryColumn::SalePrice, ColumnValue::Decimal(v)) => record.sale_price = *v,
                (InventoryColumn::Margin, ColumnValue::Decimal(v)) => record.margin = *v,
                (column, _) => return Err(type_mismatch(column.name())),
            }
        }
        Ok(record.clone())
    }

    async fn delete_inventory(&mut self, inventory_id: i64) -> AppResult<u64> {
        let state = self.state()?;
        if state
            .purchase_lines
            .iter()
            .any(|l| l.inventory_id == inventory_id)
        {
            return Err(AppError::conflict(
                "PRODUCT_REFERENCED",
                "Inventory record is referenced by purchase lines",
            ));
        }
        Ok(u64::from(state.inventory.remove(&inventory_id).is_some()))
    }
}

#[async_trait]
impl LotRepository for MemoryTx {
    async fn find_lot(&mut self, key: &LotKey) -> AppResult<Option<Lot>> {
        Ok(self
            .state()?
            .lot(key.product_id, key.deposit_id, &key.lot_number)
            .cloned())
    }

    async fn upsert_lot(
        &mut self,
        key: &LotKey,
        quantity: i32,
        expires_on: Option<NaiveDate>,
    ) -> AppResult<Upserted<Lot>> {
        let state = self.state()?;
        if let Some(lot) = state.lots.iter_mut().find(|l| l.key() == *key) {
            lot.quantity += quantity;
            if lot.expires_on.is_none() {
                lot.expires_on = expires_on;
            }
            return Ok(Upserted {
                record: lot.clone(),
                created: false,
            });
        }

        let lot = Lot {
            id: state.next_id(),
            product_id: key.product_id,
            deposit_id: key.deposit_id,
            lot_number: key.lot_number.clone(),
            quantity,
            expires_on,
        };
        state.lots.push(lot.clone());
        Ok(Upserted {
            record: lot,
            created: true,
        })
    }

    async fn lots_for_product(&mut self, product_id: i64) -> AppResult<Vec<Lot>> {
        Ok(self
            .state()?
            .lots
            .iter()
            .filter(|l| l.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn delete_empty_lots(&mut self, product_id: i64) -> AppResult<u64> {
        let state = self.state()?;
        let before = state.lots.len();
        state
            .lots
            .retain(|l| !(l.product_id == product_id && l.quantity == 0));
        Ok((before - state.lots.len()) as u64)
    }
}

#[async_trait]
impl DepositStockRepository for MemoryTx {
    async fn deposit_exists(&mut self, deposit_id: i64) -> AppResult<bool> {
        Ok(self.state()?.deposits.contains(&deposit_id))
    }

    async fn find_deposit_stock(
        &mut self,
        product_id: i64,
        deposit_id: i64,
    ) -> AppResult<Option<DepositStock>> {
        Ok(self.state()?.stock_in(product_id, deposit_id).cloned())
    }

    async fn upsert_deposit_stock(
        &mut self,
        product_id: i64,
        deposit_id: i64,
        quantity: i32,
    ) -> AppResult<Upserted<DepositStock>> {
        let state = self.state()?;
        if let Some(stock) = state
            .deposit_stock
            .iter_mut()
            .find(|s| s.product_id == product_id && s.deposit_id == deposit_id)
        {
            stock.quantity += quantity;
            return Ok(Upserted {
                record: stock.clone(),
                created: false,
            });
        }

        let stock = DepositStock {
            id: state.next_id(),
            product_id,
            deposit_id,
            quantity,
            min_stock: 0,
        };
        state.deposit_stock.push(stock.clone());
        Ok(Upserted {
            record: stock,
            created: true,
        })
    }

    async fn deposit_stock_for_product(
        &mut self,
        product_id: i64,
    ) -> AppResult<Vec<DepositStock>> {
        Ok(self
            .state()?
            .deposit_stock
            .iter()
            .filter(|s| s.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn delete_empty_deposit_stock(&mut self, product_id: i64) -> AppResult<u64> {
        let state = self.state()?;
        let before = state.deposit_stock.len();
        state
            .deposit_stock
            .retain(|s| !(s.product_id == product_id && s.quantity == 0));
        Ok((before - state.deposit_stock.len()) as u64)
    }
}

#[async_trait]
impl PurchaseRepository for MemoryTx {
    async fn insert_purchase(&mut self, purchase: &NewPurchase) -> AppResult<Purchase> {
        let state = self.state()?;
        if state.purchases.iter().any(|p| {
            p.supplier_id == purchase.supplier_id && p.invoice_number == purchase.invoice_number
        }) {
            return Err(AppError::conflict(
                "DUPLICATE_INVOICE",
                format!(
                    "Invoice {} is already registered for supplier {}",
                    purchase.invoice_number, purchase.supplier_id
                ),
            ));
        }

        let row = Purchase {
            id: state.next_id(),
            supplier_id: purchase.supplier_id,
            invoice_number: purchase.invoice_number.clone(),
            issue_date: purchase.issue_date,
            payment_term_days: purchase.payment_term_days,
            due_date: purchase.due_date,
            subtotal: purchase.subtotal,
            discount_percent: purchase.discount_percent,
            discount_amount: purchase.discount_amount,
            surcharge_amount: purchase.surcharge_amount,
            total: purchase.total,
            amount_paid: purchase.amount_paid,
            payment_status: purchase.payment_status.as_str().to_string(),
            user_id: purchase.user_id,
        };
        state.purchases.push(row.clone());
        Ok(row)
    }

    async fn insert_purchase_line(&mut self, line: &NewPurchaseLine) -> AppResult<PurchaseLine> {
        let state = self.state()?;
        let row = PurchaseLine {
            id: state.next_id(),
            purchase_id: line.purchase_id,
            inventory_id: line.inventory_id,
            description: line.description.clone(),
            quantity: line.quantity,
            base_cost: line.base_cost,
            unit_discount: line.unit_discount,
            unit_surcharge: line.unit_surcharge,
            final_unit_cost: line.final_unit_cost,
            line_subtotal: line.line_subtotal,
        };
        state.purchase_lines.push(row.clone());
        Ok(row)
    }

    async fn insert_line_lot(&mut self, link: &NewPurchaseLineLot) -> AppResult<PurchaseLineLot> {
        let state = self.state()?;
        let row = PurchaseLineLot {
            id: state.next_id(),
            line_id: link.line_id,
            lot_id: link.lot_id,
            quantity: link.quantity,
            expires_on: link.expires_on,
        };
        state.line_lots.push(row.clone());
        Ok(row)
    }

    async fn count_lines_for_inventory(&mut self, inventory_id: i64) -> AppResult<i64> {
        Ok(self
            .state()?
            .purchase_lines
            .iter()
            .filter(|l| l.inventory_id == inventory_id)
            .count() as i64)
    }
}

#[async_trait]
impl KardexRepository for MemoryTx {
    async fn append_kardex(&mut self, entry: &NewKardexEntry) -> AppResult<KardexEntry> {
        let state = self.state()?;
        let row = KardexEntry {
            id: state.next_id(),
            product_id: entry.product_id,
            movement_date: entry.movement_date,
            opening_quantity: entry.opening_quantity,
            quantity_in: entry.quantity_in,
            quantity_out: entry.quantity_out,
            closing_quantity: entry.closing_quantity,
            unit_cost: entry.unit_cost,
            unit_price: entry.unit_price,
            detail: entry.detail.clone(),
            document_number: entry.document_number.clone(),
            movement_type: entry.movement_type.as_str().to_string(),
        };
        state.kardex.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl AuditRepository for MemoryTx {
    async fn append_audit(&mut self, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
        let state = self.state()?;
        let row = AuditEntry {
            id: state.next_id(),
            entity: entry.entity.to_string(),
            entity_id: entry.entity_id,
            action: entry.action.as_str().to_string(),
            previous: entry.previous.map(Json),
            current: entry.current.map(Json),
            user_id: entry.user_id,
            recorded_at: Utc::now(),
        };
        state.audit.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(lot_number: &str) -> LotKey {
        LotKey {
            product_id: 5,
            deposit_id: 2,
            lot_number: lot_number.to_string(),
        }
    }

    #[tokio::test]
    async fn test_find_lot_by_natural_key() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        assert!(tx.find_lot(&key("L1")).await.unwrap().is_none());

        let created = tx.upsert_lot(&key("L1"), 4, None).await.unwrap();
        assert!(created.created);
        tx.upsert_lot(&key("L1"), 6, None).await.unwrap();

        let found = tx.find_lot(&key("L1")).await.unwrap().unwrap();
        assert_eq!(found.id, created.record.id);
        assert_eq!(found.quantity, 10);

        // Same lot number in another deposit is a different lot
        let elsewhere = LotKey {
            deposit_id: 3,
            ..key("L1")
        };
        assert!(tx.find_lot(&elsewhere).await.unwrap().is_none());
        assert!(tx.find_lot(&key("L2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_deposit_stock_by_natural_key() {
        let store = MemoryStore::new();
        store.seed_deposit(2).await;
        let mut tx = store.begin().await.unwrap();

        assert!(tx.find_deposit_stock(5, 2).await.unwrap().is_none());

        tx.upsert_deposit_stock(5, 2, 7).await.unwrap();
        tx.upsert_deposit_stock(5, 2, 3).await.unwrap();

        let found = tx.find_deposit_stock(5, 2).await.unwrap().unwrap();
        assert_eq!(found.quantity, 10);
        assert_eq!(found.min_stock, 0);
        assert!(tx.find_deposit_stock(5, 3).await.unwrap().is_none());
        assert!(tx.find_deposit_stock(6, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_see_only_committed_rows_after_rollback() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.upsert_lot(&key("L1"), 4, None).await.unwrap();
        tx.rollback().await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_lot(&key("L1")).await.unwrap().is_none());
    }
}
