//! HTTP handlers for purchase intake

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use shared::models::PurchaseIntakeRequest;

use crate::error::ServiceResponse;
use crate::handlers::body_rejection;
use crate::services::{IntakeReceipt, PurchaseIntakeService};
use crate::AppState;

/// Register a purchase invoice
pub async fn register_purchase(
    State(state): State<AppState>,
    payload: Result<Json<PurchaseIntakeRequest>, JsonRejection>,
) -> ServiceResponse<IntakeReceipt> {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => return ServiceResponse::failure(&body_rejection(rejection)),
    };

    let service = PurchaseIntakeService::new(state.store.clone())
        .with_timeout(state.config.intake.transaction_timeout());
    ServiceResponse::from_result(
        service.register(request).await,
        StatusCode::CREATED,
        "Purchase registered",
    )
}
