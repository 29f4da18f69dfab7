//! HTTP handlers.
//!
//! Thin translation between HTTP requests and the reconciler/gateway/store.
//! The webhook handler is the only one with routing-order sensitivity: it
//! consumes the raw body bytes so the signature is computed over exactly
//! what the provider sent.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::EventReconciler;
use crate::domain::entitlement::{EntitlementRecord, Plan};
use crate::ports::{BillingGateway, EntitlementStore, GatewayError, StoreError};

use super::dto::{
    CreateCheckoutSessionRequest, ErrorResponse, PortalSessionRequest, SessionUrlResponse,
    UserStatusResponse,
};

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntitlementStore>,
    pub gateway: Arc<dyn BillingGateway>,
    pub reconciler: Arc<EventReconciler>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntitlementStore>, gateway: Arc<dyn BillingGateway>) -> Self {
        let reconciler = Arc::new(EventReconciler::new(store.clone(), gateway.clone()));
        Self {
            store,
            gateway,
            reconciler,
        }
    }
}

/// POST /create-checkout-session - start a subscription checkout.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<Json<SessionUrlResponse>, ApiError> {
    let plan = Plan::parse(&request.plan)
        .filter(Plan::is_paid)
        .ok_or_else(|| ApiError::bad_request(format!("invalid plan: {}", request.plan)))?;

    let session = state
        .gateway
        .create_checkout_session(plan, &request.user_id)
        .await?;

    Ok(Json(SessionUrlResponse { url: session.url }))
}

/// POST /stripe-portal - create a billing-portal session.
pub async fn stripe_portal(
    State(state): State<AppState>,
    Json(request): Json<PortalSessionRequest>,
) -> Result<Json<SessionUrlResponse>, ApiError> {
    let session = state
        .gateway
        .create_portal_session(&request.customer_id)
        .await?;

    Ok(Json(SessionUrlResponse { url: session.url }))
}

/// GET /user/:user_id/status - read a user's entitlement record.
///
/// Unknown users get the synthetic freemium record, never an error.
pub async fn user_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStatusResponse>, ApiError> {
    let record = state
        .store
        .get(&user_id)
        .await?
        .unwrap_or_else(EntitlementRecord::freemium);

    Ok(Json(UserStatusResponse::from(record)))
}

/// POST /webhook - receive a billing-provider event.
///
/// Verification failures are rejected with 400. Once the signature checks
/// out the event is acknowledged with 200 whatever the reconciliation
/// outcome: the provider redelivers on non-2xx, and redelivering an event
/// we cannot resolve or persist would never succeed either.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("missing Stripe-Signature header"))?;

    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .map_err(|error| {
            tracing::warn!(%error, "webhook rejected");
            ApiError::bad_request(error.to_string())
        })?;

    match state.reconciler.reconcile(event).await {
        Ok(outcome) => tracing::debug!(?outcome, "webhook reconciled"),
        Err(error) => tracing::error!(%error, "webhook reconciliation failed, acknowledging anyway"),
    }

    Ok(StatusCode::OK)
}

/// GET /healthz - liveness probe.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error carrying the status code and message body to respond with.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        tracing::error!(error = %err, "gateway call failed");
        ApiError::internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store call failed");
        ApiError::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let response = ApiError::bad_request("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gateway_error_maps_to_500() {
        let response = ApiError::from(GatewayError::Network("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_error_maps_to_500() {
        let response =
            ApiError::from(StoreError::Database("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
