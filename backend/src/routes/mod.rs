//! Route definitions for the stock intake API

use axum::{
    routing::{post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/purchases", post(handlers::register_purchase))
        .nest("/products", product_routes())
}

/// Product correction routes
fn product_routes() -> Router<AppState> {
    Router::new().route(
        "/:id_producto",
        put(handlers::update_product).delete(handlers::delete_product),
    )
}
