//! End-to-end webhook flow over the real router.
//!
//! Drives the HTTP surface with real signature verification and the
//! in-memory store: forged deliveries are rejected without touching the
//! store, a signed checkout-completed activates the user, and a signed
//! cancellation reverts them to the freemium default.

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use hmac::{Hmac, Mac};
use http::{header, Request, StatusCode};
use sha2::Sha256;
use tower::ServiceExt;

use paystate::adapters::http::{cors_layer, router, AppState};
use paystate::adapters::memory::InMemoryEntitlementStore;
use paystate::adapters::stripe::{StripeGateway, StripeGatewayConfig};

const WEBHOOK_SECRET: &str = "whsec_integration_secret";

fn test_app() -> (Router, Arc<InMemoryEntitlementStore>) {
    let store = Arc::new(InMemoryEntitlementStore::new());
    let gateway = StripeGateway::new(
        StripeGatewayConfig::new("sk_test_key", WEBHOOK_SECRET)
            // Unroutable host: outbound calls must fail fast, not hit Stripe.
            .with_base_url("http://127.0.0.1:1"),
    );
    let state = AppState::new(store.clone(), Arc::new(gateway));
    let app = router(
        state,
        cors_layer(&[]),
        std::time::Duration::from_secs(30),
    );
    (app, store)
}

fn sign(payload: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    let signature: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("t={},v1={}", timestamp, signature)
}

fn webhook_request(payload: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("Stripe-Signature", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn get_status(app: &Router, user_id: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/user/{}/status", user_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn checkout_completed_payload(user_id: &str, plan: &str) -> String {
    serde_json::json!({
        "id": "evt_checkout_1",
        "type": "checkout.session.completed",
        "created": 1704067200,
        "data": {
            "object": {
                "id": "cs_1",
                "customer": "cus_1",
                "subscription": null,
                "metadata": {"userId": user_id, "plan": plan}
            }
        },
        "livemode": false
    })
    .to_string()
}

fn subscription_canceled_payload(user_id: &str) -> String {
    serde_json::json!({
        "id": "evt_cancel_1",
        "type": "customer.subscription.deleted",
        "created": 1704070000,
        "data": {
            "object": {
                "id": "sub_1",
                "customer": "cus_1",
                "status": "canceled",
                "metadata": {"userId": user_id, "plan": "pro"}
            }
        },
        "livemode": false
    })
    .to_string()
}

#[tokio::test]
async fn forged_signature_is_rejected_and_store_untouched() {
    let (app, store) = test_app();

    let payload = checkout_completed_payload("u1", "pro");
    let response = app
        .clone()
        .oneshot(webhook_request(&payload, "t=1704067200,v1=deadbeef"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let (app, store) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .body(Body::from(checkout_completed_payload("u1", "pro")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn checkout_then_cancel_full_flow() {
    let (app, _store) = test_app();

    // Signed checkout-completed activates the plan.
    let payload = checkout_completed_payload("u1", "pro");
    let response = app
        .clone()
        .oneshot(webhook_request(&payload, &sign(&payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = get_status(&app, "u1").await;
    assert_eq!(status["plan"], "pro");
    assert_eq!(status["active"], true);
    assert_eq!(status["billingCustomerId"], "cus_1");

    // Signed cancellation referencing the subscription metadata reverts
    // the user to the freemium default and clears the customer id.
    let payload = subscription_canceled_payload("u1");
    let response = app
        .clone()
        .oneshot(webhook_request(&payload, &sign(&payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = get_status(&app, "u1").await;
    assert_eq!(status["plan"], "freemium");
    assert_eq!(status["active"], false);
    assert!(status["billingCustomerId"].is_null());
}

#[tokio::test]
async fn replayed_checkout_event_is_idempotent() {
    let (app, store) = test_app();

    let payload = checkout_completed_payload("u1", "base");
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(webhook_request(&payload, &sign(&payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(store.len().await, 1);
    let status = get_status(&app, "u1").await;
    assert_eq!(status["plan"], "base");
    assert_eq!(status["active"], true);
}

#[tokio::test]
async fn checkout_without_metadata_acknowledged_without_mutation() {
    let (app, store) = test_app();

    let payload = serde_json::json!({
        "id": "evt_bare",
        "type": "checkout.session.completed",
        "created": 1704067200,
        "data": {"object": {"id": "cs_1", "customer": "cus_1", "metadata": {}}},
        "livemode": false
    })
    .to_string();

    let response = app
        .clone()
        .oneshot(webhook_request(&payload, &sign(&payload)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn payment_failed_with_resolvable_user_deactivates() {
    let (app, _store) = test_app();

    let payload = checkout_completed_payload("u2", "mini");
    app.clone()
        .oneshot(webhook_request(&payload, &sign(&payload)))
        .await
        .unwrap();

    let payload = serde_json::json!({
        "id": "evt_failed_1",
        "type": "invoice.payment_failed",
        "created": 1704070000,
        "data": {
            "object": {
                "id": "in_1",
                "subscription": null,
                "metadata": {"userId": "u2"}
            }
        },
        "livemode": false
    })
    .to_string();
    let response = app
        .clone()
        .oneshot(webhook_request(&payload, &sign(&payload)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = get_status(&app, "u2").await;
    assert_eq!(status["plan"], "freemium");
    assert_eq!(status["active"], false);
}

#[tokio::test]
async fn unknown_user_status_returns_freemium_default() {
    let (app, _store) = test_app();

    let status = get_status(&app, "nobody").await;
    assert_eq!(status["plan"], "freemium");
    assert_eq!(status["active"], false);
    assert!(status["billingCustomerId"].is_null());
    assert!(status["updatedAt"].is_string());
}

#[tokio::test]
async fn unknown_plan_at_checkout_is_a_400_with_error_body() {
    let (app, _store) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/create-checkout-session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"plan": "gold", "userId": "u1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].as_str().unwrap().contains("invalid plan"));
}

#[tokio::test]
async fn freemium_is_not_purchasable() {
    let (app, _store) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/create-checkout-session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"plan": "freemium", "userId": "u1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_failure_on_portal_is_a_500_with_error_body() {
    let (app, _store) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/stripe-portal")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"customerId": "cus_1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn healthz_responds_ok() {
    let (app, _store) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
