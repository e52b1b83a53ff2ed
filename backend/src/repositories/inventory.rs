//! Inventory record queries

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use super::{ColumnChanges, InventoryColumn, InventoryRepository};
use crate::db::PgTx;
use crate::error::{AppError, AppResult};
use crate::models::InventoryRecord;

const INVENTORY_COLUMNS: &str = "id_inventario, id_producto, sku, existencia_general, \
     costo_unitario, precio_venta, margen_ganancia, stock_minimo_general";

#[async_trait]
impl InventoryRepository for PgTx {
    async fn lock_by_product(&mut self, product_id: i64) -> AppResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventario WHERE id_producto = $1 FOR UPDATE"
        ))
        .bind(product_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(record)
    }

    async fn apply_receipt(
        &mut self,
        inventory_id: i64,
        unit_cost: Decimal,
        sale_price: Decimal,
        quantity: i32,
    ) -> AppResult<InventoryRecord> {
        // The increment is applied by the store, not computed client-side
        let record = sqlx::query_as::<_, InventoryRecord>(&format!(
            r#"
            UPDATE inventario
            SET costo_unitario = $1,
                precio_venta = $2,
                existencia_general = existencia_general + $3
            WHERE id_inventario = $4
            RETURNING {INVENTORY_COLUMNS}
            "#
        ))
        .bind(unit_cost)
        .bind(sale_price)
        .bind(quantity)
        .bind(inventory_id)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or_else(|| AppError::not_found("NOT_FOUND", "Inventory record not found"))?;

        Ok(record)
    }

    async fn update_inventory(
        &mut self,
        inventory_id: i64,
        changes: &ColumnChanges<InventoryColumn>,
    ) -> AppResult<InventoryRecord> {
        if changes.is_empty() {
            return Err(AppError::Internal(
                "empty inventory update reached the repository".to_string(),
            ));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE inventario SET ");
        changes.push_assignments(&mut builder);
        builder.push(" WHERE id_inventario = ");
        builder.push_bind(inventory_id);
        builder.push(" RETURNING ");
        builder.push(INVENTORY_COLUMNS);

        let record = builder
            .build_query_as::<InventoryRecord>()
            .fetch_optional(self.conn()?)
            .await?
            .ok_or_else(|| AppError::not_found("NOT_FOUND", "Inventory record not found"))?;

        Ok(record)
    }

    async fn delete_inventory(&mut self, inventory_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM inventario WHERE id_inventario = $1")
            .bind(inventory_id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected())
    }
}
