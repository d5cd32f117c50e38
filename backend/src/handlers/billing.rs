//! Billing HTTP handlers
//!
//! Checkout redirects through Stripe; subscription state comes back through
//! the webhook endpoint, which verifies the `Stripe-Signature` header against
//! the raw request body before trusting the event.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use shared::models::Subscription;

use crate::error::{AppError, AppResult};
use crate::external::stripe::{verify_webhook_signature, StripeClient};
use crate::middleware::CurrentUser;
use crate::services::billing::{BillingService, RevenueMetrics, WebhookAction, WebhookEvent};
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// "monthly" or "annual"
    pub plan: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    /// NRR window length; defaults to a year
    pub window_days: Option<i64>,
}

/// Start a subscription checkout for the caller's organisation
pub async fn create_checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CheckoutRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if !user.can_manage_billing() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = BillingService::new(state.db.clone(), state.config.stripe.clone());
    let price_id = service.price_id_for_plan(&body.plan)?.to_string();

    let client = StripeClient::new(state.config.stripe.secret_key.clone());
    let session = client
        .create_checkout_session(
            &price_id,
            &user.org_id.to_string(),
            &body.success_url,
            &body.cancel_url,
        )
        .await?;

    Ok(Json(serde_json::json!({
        "sessionId": session.id,
        "url": session.url,
    })))
}

/// Get the caller's organisation subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Option<Subscription>>> {
    let service = BillingService::new(state.db.clone(), state.config.stripe.clone());
    let subscription = service.get_subscription(user.org_id).await?;
    Ok(Json(subscription))
}

/// Receive a Stripe webhook (public, signature-verified)
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAction>> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Validation {
            field: "Stripe-Signature".to_string(),
            message: "Missing signature header".to_string(),
        })?;

    verify_webhook_signature(signature, &body, &state.config.stripe.webhook_secret).map_err(
        |msg| AppError::Validation {
            field: "Stripe-Signature".to_string(),
            message: msg,
        },
    )?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::PaymentProviderError(format!("malformed event: {}", e)))?;

    let service = BillingService::new(state.db.clone(), state.config.stripe.clone());
    let action = service.handle_webhook_event(event).await?;
    Ok(Json(action))
}

/// Revenue metrics for the platform admin dashboard.
///
/// The numbers span every organisation, so an org owner's billing
/// permission is not enough here.
pub async fn revenue_metrics(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MetricsQuery>,
) -> AppResult<Json<RevenueMetrics>> {
    if !user.is_platform_admin() {
        return Err(AppError::InsufficientPermissions);
    }

    let window_start = Utc::now() - Duration::days(query.window_days.unwrap_or(365));

    let service = BillingService::new(state.db.clone(), state.config.stripe.clone());
    let metrics = service.revenue_metrics(window_start).await?;
    Ok(Json(metrics))
}

/// Export the platform-wide subscription ledger as CSV (platform admin only)
pub async fn export_ledger(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<impl IntoResponse> {
    if !user.is_platform_admin() {
        return Err(AppError::InsufficientPermissions);
    }

    let service = BillingService::new(state.db.clone(), state.config.stripe.clone());
    let csv = service.export_ledger_csv().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"subscription_ledger.csv\"",
            ),
        ],
        csv,
    ))
}
