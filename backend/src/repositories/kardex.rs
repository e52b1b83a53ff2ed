//! Kardex appends

use async_trait::async_trait;

use super::KardexRepository;
use crate::db::PgTx;
use crate::error::AppResult;
use crate::models::{KardexEntry, NewKardexEntry};

#[async_trait]
impl KardexRepository for PgTx {
    async fn append_kardex(&mut self, entry: &NewKardexEntry) -> AppResult<KardexEntry> {
        let row = sqlx::query_as::<_, KardexEntry>(
            r#"
            INSERT INTO kardex (
                id_producto, fecha, cantidad_inicial, cantidad_entrada, cantidad_salida,
                cantidad_final, costo_unitario, precio_unitario, detalle, nro_documento,
                tipo_movimiento
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id_kardex, id_producto, fecha, cantidad_inicial, cantidad_entrada,
                      cantidad_salida, cantidad_final, costo_unitario, precio_unitario,
                      detalle, nro_documento, tipo_movimiento
            "#,
        )
        .bind(entry.product_id)
        .bind(entry.movement_date)
        .bind(entry.opening_quantity)
        .bind(entry.quantity_in)
        .bind(entry.quantity_out)
        .bind(entry.closing_quantity)
        .bind(entry.unit_cost)
        .bind(entry.unit_price)
        .bind(&entry.detail)
        .bind(&entry.document_number)
        .bind(entry.movement_type.as_str())
        .fetch_one(self.conn()?)
        .await?;

        Ok(row)
    }
}
