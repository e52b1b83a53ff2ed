//! Product update and delete tests
//!
//! Tests for post-intake corrections:
//! - Audit gating on cost/margin/price
//! - Price re-derivation and stock adjustments
//! - Reject-if-stocked, cascade-if-empty deletion

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use shared::models::PurchaseIntakeRequest;
use stock_intake::db::memory::{InventorySeed, MemoryStore};
use stock_intake::services::{ProductMutationService, PurchaseIntakeService};
use stock_intake::ErrorKind;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object payload")
}

fn priced() -> InventorySeed {
    InventorySeed {
        quantity: 12,
        unit_cost: dec("100.00"),
        margin: dec("30.00"),
        sale_price: dec("130.00"),
    }
}

async fn setup(seed: InventorySeed) -> (MemoryStore, ProductMutationService, i64) {
    let store = MemoryStore::new();
    let inventory_id = store.seed_product(5, seed).await;
    let service = ProductMutationService::new(Arc::new(store.clone()));
    (store, service, inventory_id)
}

// ============================================================================
// Update Tests
// ============================================================================

#[tokio::test]
async fn test_same_values_write_no_audit() {
    let (store, service, inventory_id) = setup(priced()).await;

    let outcome = service
        .update(
            5,
            &fields(json!({
                "costo_unitario": "100,00",
                "margen_ganancia": 30,
                "usuario_id": 7
            })),
        )
        .await
        .unwrap();

    assert!(!outcome.audited);
    assert_eq!(outcome.inventory.sale_price, dec("130.00"));
    assert!(store
        .snapshot()
        .await
        .audit_for("inventario", inventory_id)
        .is_empty());
}

#[tokio::test]
async fn test_margin_change_writes_one_audit() {
    let (store, service, inventory_id) = setup(priced()).await;

    let outcome = service
        .update(5, &fields(json!({ "margen_ganancia": "50", "usuario_id": 7 })))
        .await
        .unwrap();

    assert!(outcome.audited);
    assert_eq!(outcome.inventory.sale_price, dec("150.00"));

    let state = store.snapshot().await;
    let audits = state.audit_for("inventario", inventory_id);
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "UPDATE");
    assert_eq!(audits[0].user_id, Some(7));

    let previous = audits[0].previous.as_ref().unwrap();
    let current = audits[0].current.as_ref().unwrap();
    assert_eq!(
        (previous.cost, previous.margin, previous.price),
        (dec("100.00"), dec("30.00"), dec("130.00"))
    );
    assert_eq!(
        (current.cost, current.margin, current.price),
        (dec("100.00"), dec("50"), dec("150.00"))
    );
}

#[tokio::test]
async fn test_explicit_price_only_change_is_audited() {
    let (store, service, _) = setup(priced()).await;

    let outcome = service
        .update(5, &fields(json!({ "precio_venta": "135,00" })))
        .await
        .unwrap();

    assert!(outcome.audited);
    assert_eq!(outcome.inventory.unit_cost, dec("100.00"));
    assert_eq!(store.snapshot().await.audit.len(), 1);
}

#[tokio::test]
async fn test_catalog_only_update_touches_no_inventory() {
    let (store, service, _) = setup(priced()).await;

    let outcome = service
        .update(5, &fields(json!({ "descripcion": "Gasas estériles", "id_marca": 4 })))
        .await
        .unwrap();

    assert!(!outcome.audited);
    assert!(!outcome.adjusted);

    let state = store.snapshot().await;
    let product = &state.products[&5];
    assert_eq!(product.description.as_deref(), Some("Gasas estériles"));
    assert_eq!(product.brand_id, Some(4));
    assert!(state.kardex.is_empty());
}

#[tokio::test]
async fn test_quantity_change_is_recorded_as_adjustment() {
    let (store, service, _) = setup(priced()).await;

    let outcome = service
        .update(5, &fields(json!({ "existencia_general": 9 })))
        .await
        .unwrap();
    assert!(outcome.adjusted);

    let state = store.snapshot().await;
    let entries = state.kardex_for(5);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].movement_type, "ADJUSTMENT");
    assert_eq!(entries[0].opening_quantity, 12);
    assert_eq!(entries[0].quantity_out, 3);
    assert_eq!(entries[0].closing_quantity, 9);
}

#[tokio::test]
async fn test_empty_update_is_no_data() {
    let (_, service, _) = setup(priced()).await;

    let err = service
        .update(5, &fields(json!({ "id_producto": 5 })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.code(), "NO_DATA");
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let (store, service, _) = setup(priced()).await;

    let err = service
        .update(5, &fields(json!({ "sku": "A-1", "id_inventario": 3 })))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_FIELD");
    assert_eq!(store.snapshot().await.inventory_for(5).unwrap().sku, None);
}

#[tokio::test]
async fn test_update_missing_product_is_not_found() {
    let (_, service, _) = setup(priced()).await;

    let err = service
        .update(404, &fields(json!({ "sku": "A-1" })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_without_inventory_record_is_not_found() {
    let (store, service, _) = setup(priced()).await;
    store.seed_bare_product(6).await;

    let err = service
        .update(6, &fields(json!({ "descripcion": "Sin stock" })))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert_eq!(store.snapshot().await.products[&6].description, None);
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_empty_product_cascades() {
    let (store, service, inventory_id) = setup(InventorySeed::default()).await;

    let deletion = service.delete(5, Some(7)).await.unwrap();
    assert_eq!(deletion.inventory_id, Some(inventory_id));

    let state = store.snapshot().await;
    assert!(!state.products.contains_key(&5));
    assert!(state.inventory_for(5).is_none());

    let audits = state.audit_for("inventario", inventory_id);
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "DELETE");
    assert!(audits[0].current.is_none());
}

#[tokio::test]
async fn test_delete_bare_product() {
    let store = MemoryStore::new();
    store.seed_bare_product(8).await;
    let service = ProductMutationService::new(Arc::new(store.clone()));

    let deletion = service.delete(8, None).await.unwrap();
    assert_eq!(deletion.inventory_id, None);
    assert!(store.snapshot().await.products.is_empty());
}

#[tokio::test]
async fn test_delete_stocked_product_is_conflict() {
    let (store, service, _) = setup(priced()).await;

    let err = service.delete(5, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.code(), "PRODUCT_HAS_STOCK");
    assert!(store.snapshot().await.products.contains_key(&5));
}

#[tokio::test]
async fn test_delete_purchased_product_is_conflict() {
    let (store, service, _) = setup(InventorySeed::default()).await;
    let intake = PurchaseIntakeService::new(Arc::new(store.clone()));

    let request: PurchaseIntakeRequest = serde_json::from_value(json!({
        "id_proveedor": 1,
        "nro_factura": "FAC-100",
        "fecha_emision": "2024-03-01",
        "items": [{ "id_producto": 5, "Cant": 2, "Costo_Ficha": "10,00" }]
    }))
    .unwrap();
    intake.register(request).await.unwrap();

    service
        .update(5, &fields(json!({ "existencia_general": 0 })))
        .await
        .unwrap();

    let err = service.delete(5, None).await.unwrap_err();
    assert_eq!(err.code(), "PRODUCT_REFERENCED");

    let state = store.snapshot().await;
    assert!(state.inventory_for(5).is_some());
    assert_eq!(state.kardex_for(5).len(), 2);
}

#[tokio::test]
async fn test_delete_missing_product_is_not_found() {
    let (_, service, _) = setup(priced()).await;

    let err = service.delete(404, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.code(), "NOT_FOUND");
}
