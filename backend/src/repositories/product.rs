//! Product catalog row operations used by the mutation paths

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{ColumnChanges, ProductColumn, ProductRepository};
use crate::db::PgTx;
use crate::error::{AppError, AppResult};

#[async_trait]
impl ProductRepository for PgTx {
    async fn product_exists(&mut self, product_id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM productos WHERE id_producto = $1)",
        )
        .bind(product_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(exists)
    }

    async fn update_product(
        &mut self,
        product_id: i64,
        changes: &ColumnChanges<ProductColumn>,
    ) -> AppResult<u64> {
        if changes.is_empty() {
            return Err(AppError::Internal(
                "empty product update reached the repository".to_string(),
            ));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE productos SET ");
        changes.push_assignments(&mut builder);
        builder.push(" WHERE id_producto = ");
        builder.push_bind(product_id);

        let result = builder.build().execute(self.conn()?).await?;
        Ok(result.rows_affected())
    }

    async fn delete_product(&mut self, product_id: i64) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM productos WHERE id_producto = $1")
            .bind(product_id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected())
    }
}
