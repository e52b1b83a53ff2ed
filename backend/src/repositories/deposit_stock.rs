//! Per-deposit stock counters

use async_trait::async_trait;
use sqlx::FromRow;

use super::DepositStockRepository;
use crate::db::PgTx;
use crate::error::AppResult;
use crate::models::{DepositStock, Upserted};

const STOCK_COLUMNS: &str = "id_stock, id_producto, id_deposito, cantidad, stock_minimo";

#[derive(FromRow)]
struct UpsertedStockRow {
    #[sqlx(flatten)]
    stock: DepositStock,
    created: bool,
}

#[async_trait]
impl DepositStockRepository for PgTx {
    async fn deposit_exists(&mut self, deposit_id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM depositos WHERE id_deposito = $1)",
        )
        .bind(deposit_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(exists)
    }

    async fn find_deposit_stock(
        &mut self,
        product_id: i64,
        deposit_id: i64,
    ) -> AppResult<Option<DepositStock>> {
        let stock = sqlx::query_as::<_, DepositStock>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_deposito WHERE id_producto = $1 AND id_deposito = $2"
        ))
        .bind(product_id)
        .bind(deposit_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(stock)
    }

    async fn upsert_deposit_stock(
        &mut self,
        product_id: i64,
        deposit_id: i64,
        quantity: i32,
    ) -> AppResult<Upserted<DepositStock>> {
        let row = sqlx::query_as::<_, UpsertedStockRow>(&format!(
            r#"
            INSERT INTO stock_deposito (id_producto, id_deposito, cantidad, stock_minimo)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (id_producto, id_deposito)
            DO UPDATE SET cantidad = stock_deposito.cantidad + EXCLUDED.cantidad
            RETURNING {STOCK_COLUMNS}, (xmax = 0) AS created
            "#
        ))
        .bind(product_id)
        .bind(deposit_id)
        .bind(quantity)
        .fetch_one(self.conn()?)
        .await?;

        Ok(Upserted {
            record: row.stock,
            created: row.created,
        })
    }

    async fn deposit_stock_for_product(
        &mut self,
        product_id: i64,
    ) -> AppResult<Vec<DepositStock>> {
        let rows = sqlx::query_as::<_, DepositStock>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_deposito WHERE id_producto = $1 ORDER BY id_deposito"
        ))
        .bind(product_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(rows)
    }

    async fn delete_empty_deposit_stock(&mut self, product_id: i64) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM stock_deposito WHERE id_producto = $1 AND cantidad = 0")
                .bind(product_id)
                .execute(self.conn()?)
                .await?;

        Ok(result.rows_affected())
    }
}
