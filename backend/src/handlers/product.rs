//! HTTP handlers for product corrections and removal

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ServiceResponse;
use crate::handlers::{body_rejection, path_rejection, query_rejection};
use crate::services::{ProductDeletion, ProductMutationService, ProductUpdateOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteProductQuery {
    pub usuario_id: Option<i64>,
}

fn mutation_service(state: &AppState) -> ProductMutationService {
    ProductMutationService::new(state.store.clone())
        .with_timeout(state.config.intake.transaction_timeout())
}

/// Apply a sparse update to a product and its inventory record
pub async fn update_product(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ServiceResponse<ProductUpdateOutcome> {
    let Path(product_id) = match path {
        Ok(path) => path,
        Err(rejection) => return ServiceResponse::failure(&path_rejection(rejection)),
    };
    let Json(fields) = match payload {
        Ok(body) => body,
        Err(rejection) => return ServiceResponse::failure(&body_rejection(rejection)),
    };

    let result = mutation_service(&state).update(product_id, &fields).await;
    ServiceResponse::from_result(result, StatusCode::OK, "Product updated")
}

/// Delete a product without stock or purchase history
pub async fn delete_product(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<DeleteProductQuery>, QueryRejection>,
) -> ServiceResponse<ProductDeletion> {
    let Path(product_id) = match path {
        Ok(path) => path,
        Err(rejection) => return ServiceResponse::failure(&path_rejection(rejection)),
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return ServiceResponse::failure(&query_rejection(rejection)),
    };

    let result = mutation_service(&state)
        .delete(product_id, query.usuario_id)
        .await;
    ServiceResponse::from_result(result, StatusCode::OK, "Product deleted")
}
