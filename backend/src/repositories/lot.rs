//! Lot queries keyed by (product, deposit, lot number)

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::FromRow;

use super::LotRepository;
use crate::db::PgTx;
use crate::error::AppResult;
use crate::models::{Lot, LotKey, Upserted};

const LOT_COLUMNS: &str =
    "id_lote, id_producto, id_deposito, nro_lote, cantidad, fecha_vencimiento";

#[derive(FromRow)]
struct UpsertedLotRow {
    #[sqlx(flatten)]
    lot: Lot,
    created: bool,
}

#[async_trait]
impl LotRepository for PgTx {
    async fn find_lot(&mut self, key: &LotKey) -> AppResult<Option<Lot>> {
        let lot = sqlx::query_as::<_, Lot>(&format!(
            r#"
            SELECT {LOT_COLUMNS}
            FROM lotes
            WHERE id_producto = $1 AND id_deposito = $2 AND nro_lote = $3
            "#
        ))
        .bind(key.product_id)
        .bind(key.deposit_id)
        .bind(&key.lot_number)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(lot)
    }

    async fn upsert_lot(
        &mut self,
        key: &LotKey,
        quantity: i32,
        expires_on: Option<NaiveDate>,
    ) -> AppResult<Upserted<Lot>> {
        // xmax = 0 only for rows inserted by this statement
        let row = sqlx::query_as::<_, UpsertedLotRow>(&format!(
            r#"
            INSERT INTO lotes (id_producto, id_deposito, nro_lote, cantidad, fecha_vencimiento)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id_producto, id_deposito, nro_lote)
            DO UPDATE SET cantidad = lotes.cantidad + EXCLUDED.cantidad,
                          fecha_vencimiento = COALESCE(lotes.fecha_vencimiento, EXCLUDED.fecha_vencimiento)
            RETURNING {LOT_COLUMNS}, (xmax = 0) AS created
            "#
        ))
        .bind(key.product_id)
        .bind(key.deposit_id)
        .bind(&key.lot_number)
        .bind(quantity)
        .bind(expires_on)
        .fetch_one(self.conn()?)
        .await?;

        Ok(Upserted {
            record: row.lot,
            created: row.created,
        })
    }

    async fn lots_for_product(&mut self, product_id: i64) -> AppResult<Vec<Lot>> {
        let lots = sqlx::query_as::<_, Lot>(&format!(
            "SELECT {LOT_COLUMNS} FROM lotes WHERE id_producto = $1 ORDER BY id_deposito, nro_lote"
        ))
        .bind(product_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(lots)
    }

    async fn delete_empty_lots(&mut self, product_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM lotes WHERE id_producto = $1 AND cantidad = 0")
            .bind(product_id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected())
    }
}
