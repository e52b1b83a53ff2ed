//! Purchase header, line and line/lot inserts

use async_trait::async_trait;

use super::PurchaseRepository;
use crate::db::{is_unique_violation, PgTx};
use crate::error::{AppError, AppResult};
use crate::models::{
    NewPurchase, NewPurchaseLine, NewPurchaseLineLot, Purchase, PurchaseLine, PurchaseLineLot,
};

#[async_trait]
impl PurchaseRepository for PgTx {
    async fn insert_purchase(&mut self, purchase: &NewPurchase) -> AppResult<Purchase> {
        let result = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO compras (
                id_proveedor, nro_factura, fecha_emision, dias_plazo, fecha_vencimiento,
                subtotal, porcentaje_descuento, monto_descuento, monto_cargos, total,
                monto_abonado, estado_pago, id_usuario
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id_compra, id_proveedor, nro_factura, fecha_emision, dias_plazo,
                      fecha_vencimiento, subtotal, porcentaje_descuento, monto_descuento,
                      monto_cargos, total, monto_abonado, estado_pago, id_usuario
            "#,
        )
        .bind(purchase.supplier_id)
        .bind(&purchase.invoice_number)
        .bind(purchase.issue_date)
        .bind(purchase.payment_term_days)
        .bind(purchase.due_date)
        .bind(purchase.subtotal)
        .bind(purchase.discount_percent)
        .bind(purchase.discount_amount)
        .bind(purchase.surcharge_amount)
        .bind(purchase.total)
        .bind(purchase.amount_paid)
        .bind(purchase.payment_status.as_str())
        .bind(purchase.user_id)
        .fetch_one(self.conn()?)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(e) if is_unique_violation(&e) => Err(AppError::conflict(
                "DUPLICATE_INVOICE",
                format!(
                    "Invoice {} is already registered for supplier {}",
                    purchase.invoice_number, purchase.supplier_id
                ),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_purchase_line(&mut self, line: &NewPurchaseLine) -> AppResult<PurchaseLine> {
        let row = sqlx::query_as::<_, PurchaseLine>(
            r#"
            INSERT INTO compras_detalle (
                id_compra, id_inventario, descripcion, cantidad, costo_base,
                descuento_unitario, cargo_unitario, costo_final, subtotal_linea
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id_detalle, id_compra, id_inventario, descripcion, cantidad, costo_base,
                      descuento_unitario, cargo_unitario, costo_final, subtotal_linea
            "#,
        )
        .bind(line.purchase_id)
        .bind(line.inventory_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.base_cost)
        .bind(line.unit_discount)
        .bind(line.unit_surcharge)
        .bind(line.final_unit_cost)
        .bind(line.line_subtotal)
        .fetch_one(self.conn()?)
        .await?;

        Ok(row)
    }

    async fn insert_line_lot(&mut self, link: &NewPurchaseLineLot) -> AppResult<PurchaseLineLot> {
        let row = sqlx::query_as::<_, PurchaseLineLot>(
            r#"
            INSERT INTO compras_detalle_lotes (id_detalle, id_lote, cantidad, fecha_vencimiento)
            VALUES ($1, $2, $3, $4)
            RETURNING id_detalle_lote, id_detalle, id_lote, cantidad, fecha_vencimiento
            "#,
        )
        .bind(link.line_id)
        .bind(link.lot_id)
        .bind(link.quantity)
        .bind(link.expires_on)
        .fetch_one(self.conn()?)
        .await?;

        Ok(row)
    }

    async fn count_lines_for_inventory(&mut self, inventory_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM compras_detalle WHERE id_inventario = $1",
        )
        .bind(inventory_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(count)
    }
}
