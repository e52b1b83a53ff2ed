//! Repositories over the per-entity tables
//!
//! Every method runs on the caller's transaction handle; no repository opens
//! or commits a transaction of its own. The Postgres implementations live in
//! the sibling modules, the in-process one in [`crate::db::memory`].

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{
    AuditEntry, DepositStock, InventoryRecord, KardexEntry, Lot, LotKey, NewAuditEntry,
    NewKardexEntry, NewPurchase, NewPurchaseLine, NewPurchaseLineLot, Purchase, PurchaseLine,
    PurchaseLineLot, Upserted,
};

pub mod columns;

mod audit;
mod deposit_stock;
mod inventory;
mod kardex;
mod lot;
mod product;
mod purchase;

pub use columns::{ColumnChanges, ColumnValue, InventoryColumn, ProductColumn};

#[async_trait]
pub trait ProductRepository {
    async fn product_exists(&mut self, product_id: i64) -> AppResult<bool>;

    /// Apply an allowlisted column set; returns affected rows
    async fn update_product(
        &mut self,
        product_id: i64,
        changes: &ColumnChanges<ProductColumn>,
    ) -> AppResult<u64>;

    async fn delete_product(&mut self, product_id: i64) -> AppResult<u64>;
}

#[async_trait]
pub trait InventoryRepository {
    /// Read the inventory record of a product, locking it until the transaction ends
    async fn lock_by_product(&mut self, product_id: i64) -> AppResult<Option<InventoryRecord>>;

    /// Set cost and price and add `quantity` to the aggregate stock
    async fn apply_receipt(
        &mut self,
        inventory_id: i64,
        unit_cost: rust_decimal::Decimal,
        sale_price: rust_decimal::Decimal,
        quantity: i32,
    ) -> AppResult<InventoryRecord>;

    async fn update_inventory(
        &mut self,
        inventory_id: i64,
        changes: &ColumnChanges<InventoryColumn>,
    ) -> AppResult<InventoryRecord>;

    async fn delete_inventory(&mut self, inventory_id: i64) -> AppResult<u64>;
}

#[async_trait]
pub trait LotRepository {
    async fn find_lot(&mut self, key: &LotKey) -> AppResult<Option<Lot>>;

    /// Insert the lot, or add `quantity` to it when the natural key exists
    async fn upsert_lot(
        &mut self,
        key: &LotKey,
        quantity: i32,
        expires_on: Option<NaiveDate>,
    ) -> AppResult<Upserted<Lot>>;

    async fn lots_for_product(&mut self, product_id: i64) -> AppResult<Vec<Lot>>;

    /// Remove the product's lots that hold no stock
    async fn delete_empty_lots(&mut self, product_id: i64) -> AppResult<u64>;
}

#[async_trait]
pub trait DepositStockRepository {
    async fn deposit_exists(&mut self, deposit_id: i64) -> AppResult<bool>;

    async fn find_deposit_stock(
        &mut self,
        product_id: i64,
        deposit_id: i64,
    ) -> AppResult<Option<DepositStock>>;

    /// Insert the counter with a zero minimum, or add `quantity` to it
    async fn upsert_deposit_stock(
        &mut self,
        product_id: i64,
        deposit_id: i64,
        quantity: i32,
    ) -> AppResult<Upserted<DepositStock>>;

    async fn deposit_stock_for_product(&mut self, product_id: i64)
        -> AppResult<Vec<DepositStock>>;

    async fn delete_empty_deposit_stock(&mut self, product_id: i64) -> AppResult<u64>;
}

#[async_trait]
pub trait PurchaseRepository {
    /// Insert a header; a repeated (supplier, invoice) pair is a conflict
    async fn insert_purchase(&mut self, purchase: &NewPurchase) -> AppResult<Purchase>;

    async fn insert_purchase_line(&mut self, line: &NewPurchaseLine) -> AppResult<PurchaseLine>;

    async fn insert_line_lot(&mut self, link: &NewPurchaseLineLot) -> AppResult<PurchaseLineLot>;

    async fn count_lines_for_inventory(&mut self, inventory_id: i64) -> AppResult<i64>;
}

#[async_trait]
pub trait KardexRepository {
    async fn append_kardex(&mut self, entry: &NewKardexEntry) -> AppResult<KardexEntry>;
}

#[async_trait]
pub trait AuditRepository {
    async fn append_audit(&mut self, entry: &NewAuditEntry) -> AppResult<AuditEntry>;
}
