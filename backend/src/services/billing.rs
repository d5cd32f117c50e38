//! Subscription billing service
//!
//! Subscription state is driven entirely by provider webhooks: checkout
//! completion links a Stripe customer to an organisation, and subscription
//! events upsert the ledger row keyed on the provider subscription id. The
//! admin dashboard reads MRR/ARR/NRR off that ledger.

use chrono::{DateTime, TimeZone, Utc};
use csv::Writer;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    compute_arr, compute_mrr, compute_nrr, BillingInterval, Subscription, SubscriptionStatus,
};

use crate::config::StripeConfig;
use crate::error::{AppError, AppResult};

const SUBSCRIPTION_COLUMNS: &str = "id, org_id, provider_customer_id, provider_subscription_id, \
     plan, status, amount, interval, current_period_end, created_at, updated_at";

/// Billing service
#[derive(Clone)]
pub struct BillingService {
    db: PgPool,
    stripe: StripeConfig,
}

/// A provider webhook event, after signature verification
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// What a webhook did, echoed back in the 200 body
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookAction {
    CustomerLinked,
    SubscriptionUpserted,
    SubscriptionCanceled,
    Ignored,
}

/// Revenue metrics for the admin dashboard
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueMetrics {
    pub mrr: Decimal,
    pub arr: Decimal,
    /// Net revenue retention over the window, percent; absent when the
    /// starting cohort had no revenue
    pub nrr: Option<Decimal>,
    pub window_start: DateTime<Utc>,
    pub active_count: i64,
    pub past_due_count: i64,
    pub canceled_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    org_id: Uuid,
    provider_customer_id: String,
    provider_subscription_id: String,
    plan: String,
    status: String,
    amount: Decimal,
    interval: String,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_subscription(self) -> AppResult<Subscription> {
        let status = SubscriptionStatus::from_str(&self.status).map_err(AppError::Internal)?;
        let interval = BillingInterval::from_str(&self.interval).map_err(AppError::Internal)?;
        Ok(Subscription {
            id: self.id,
            org_id: self.org_id,
            provider_customer_id: self.provider_customer_id,
            provider_subscription_id: self.provider_subscription_id,
            plan: self.plan,
            status,
            amount: self.amount,
            interval,
            current_period_end: self.current_period_end,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Subscription fields pulled off `customer.subscription.*` events
#[derive(Debug)]
struct SubscriptionEvent {
    subscription_id: String,
    customer_id: String,
    status: SubscriptionStatus,
    amount: Decimal,
    interval: BillingInterval,
    price_id: String,
    current_period_end: Option<DateTime<Utc>>,
}

impl BillingService {
    pub fn new(db: PgPool, stripe: StripeConfig) -> Self {
        Self { db, stripe }
    }

    /// Resolve which provider price a plan name maps to
    pub fn price_id_for_plan(&self, plan: &str) -> AppResult<&str> {
        match plan {
            "monthly" => Ok(&self.stripe.monthly_price_id),
            "annual" => Ok(&self.stripe.annual_price_id),
            other => Err(AppError::Validation {
                field: "plan".to_string(),
                message: format!("Unknown plan: {}", other),
            }),
        }
    }

    fn plan_for_price_id(&self, price_id: &str) -> String {
        if price_id == self.stripe.monthly_price_id {
            "monthly".to_string()
        } else if price_id == self.stripe.annual_price_id {
            "annual".to_string()
        } else {
            price_id.to_string()
        }
    }

    /// Apply a verified webhook event to the ledger
    pub async fn handle_webhook_event(&self, event: WebhookEvent) -> AppResult<WebhookAction> {
        match event.event_type.as_str() {
            "checkout.session.completed" => self.link_customer(&event.data.object).await,
            "customer.subscription.created" | "customer.subscription.updated" => {
                let parsed = Self::parse_subscription_event(&event.data.object)?;
                self.upsert_subscription(parsed).await?;
                Ok(WebhookAction::SubscriptionUpserted)
            }
            "customer.subscription.deleted" => {
                let subscription_id = event.data.object["id"]
                    .as_str()
                    .ok_or_else(|| AppError::PaymentProviderError("event missing id".into()))?;
                self.cancel_subscription(subscription_id).await?;
                Ok(WebhookAction::SubscriptionCanceled)
            }
            other => {
                tracing::debug!(event_type = other, "Ignoring webhook event");
                Ok(WebhookAction::Ignored)
            }
        }
    }

    /// Record the customer id against the organisation that checked out
    async fn link_customer(&self, object: &serde_json::Value) -> AppResult<WebhookAction> {
        let org_id = object["client_reference_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                AppError::PaymentProviderError("checkout session missing client_reference_id".into())
            })?;
        let customer_id = object["customer"].as_str().ok_or_else(|| {
            AppError::PaymentProviderError("checkout session missing customer".into())
        })?;

        let updated =
            sqlx::query("UPDATE organizations SET stripe_customer_id = $1, updated_at = NOW() WHERE id = $2")
                .bind(customer_id)
                .bind(org_id)
                .execute(&self.db)
                .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Organisation".to_string()));
        }

        Ok(WebhookAction::CustomerLinked)
    }

    fn parse_subscription_event(object: &serde_json::Value) -> AppResult<SubscriptionEvent> {
        let missing =
            |field: &str| AppError::PaymentProviderError(format!("event missing {}", field));

        let subscription_id = object["id"].as_str().ok_or_else(|| missing("id"))?;
        let customer_id = object["customer"].as_str().ok_or_else(|| missing("customer"))?;
        let status_str = object["status"].as_str().ok_or_else(|| missing("status"))?;

        // Stripe has more states than we track; anything not terminal and
        // not past_due counts as active
        let status = match status_str {
            "past_due" | "unpaid" => SubscriptionStatus::PastDue,
            "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Active,
        };

        let price = &object["items"]["data"][0]["price"];
        let price_id = price["id"].as_str().ok_or_else(|| missing("price id"))?;
        let unit_amount = price["unit_amount"]
            .as_i64()
            .ok_or_else(|| missing("unit_amount"))?;
        let interval = match price["recurring"]["interval"].as_str() {
            Some("year") => BillingInterval::Annual,
            _ => BillingInterval::Monthly,
        };

        // unit_amount is in cents
        let amount = Decimal::from(unit_amount) / Decimal::from(100);

        let current_period_end = object["current_period_end"]
            .as_i64()
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        Ok(SubscriptionEvent {
            subscription_id: subscription_id.to_string(),
            customer_id: customer_id.to_string(),
            status,
            amount,
            interval,
            price_id: price_id.to_string(),
            current_period_end,
        })
    }

    async fn upsert_subscription(&self, event: SubscriptionEvent) -> AppResult<()> {
        let org_id: Uuid = sqlx::query_scalar(
            "SELECT id FROM organizations WHERE stripe_customer_id = $1",
        )
        .bind(&event.customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::PaymentProviderError(format!(
                "no organisation linked to customer {}",
                event.customer_id
            ))
        })?;

        let plan = self.plan_for_price_id(&event.price_id);

        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (org_id, provider_customer_id, provider_subscription_id, plan,
                 status, amount, interval, current_period_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (provider_subscription_id)
            DO UPDATE SET plan = $4, status = $5, amount = $6, interval = $7,
                          current_period_end = $8, updated_at = NOW()
            "#,
        )
        .bind(org_id)
        .bind(&event.customer_id)
        .bind(&event.subscription_id)
        .bind(&plan)
        .bind(event.status.as_str())
        .bind(event.amount)
        .bind(event.interval.as_str())
        .bind(event.current_period_end)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE subscriptions SET status = 'canceled', updated_at = NOW() WHERE provider_subscription_id = $1",
        )
        .bind(subscription_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Get the subscription for an organisation, if any
    pub async fn get_subscription(&self, org_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE org_id = $1 ORDER BY created_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(SubscriptionRow::into_subscription).transpose()
    }

    async fn all_subscriptions(&self) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions ORDER BY created_at ASC",
            SUBSCRIPTION_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(SubscriptionRow::into_subscription)
            .collect()
    }

    /// Compute revenue metrics across the whole platform.
    ///
    /// The NRR cohort is every org that had a subscription before
    /// `window_start`, counted at its recorded amount; the current side is
    /// per-org revenue-bearing MRR today.
    pub async fn revenue_metrics(&self, window_start: DateTime<Utc>) -> AppResult<RevenueMetrics> {
        let subscriptions = self.all_subscriptions().await?;

        let mrr = compute_mrr(&subscriptions);
        let arr = compute_arr(&subscriptions);

        let start_cohort: Vec<(Uuid, Decimal)> = subscriptions
            .iter()
            .filter(|s| s.created_at <= window_start)
            .map(|s| (s.org_id, s.monthly_amount()))
            .collect();
        let current: Vec<(Uuid, Decimal)> = subscriptions
            .iter()
            .filter(|s| s.status.is_revenue_bearing())
            .map(|s| (s.org_id, s.monthly_amount()))
            .collect();
        let nrr = compute_nrr(&start_cohort, &current);

        let mut active_count = 0;
        let mut past_due_count = 0;
        let mut canceled_count = 0;
        for sub in &subscriptions {
            match sub.status {
                SubscriptionStatus::Active => active_count += 1,
                SubscriptionStatus::PastDue => past_due_count += 1,
                SubscriptionStatus::Canceled => canceled_count += 1,
            }
        }

        Ok(RevenueMetrics {
            mrr,
            arr,
            nrr,
            window_start,
            active_count,
            past_due_count,
            canceled_count,
        })
    }

    /// Export the subscription ledger as CSV for finance
    pub async fn export_ledger_csv(&self) -> AppResult<Vec<u8>> {
        let subscriptions = self.all_subscriptions().await?;

        let mut writer = Writer::from_writer(Vec::new());
        for sub in subscriptions {
            writer
                .serialize(LedgerCsvRecord {
                    org_id: sub.org_id,
                    subscription_id: sub.provider_subscription_id,
                    plan: sub.plan,
                    status: sub.status.as_str().to_string(),
                    amount: sub.amount,
                    interval: sub.interval.as_str().to_string(),
                    monthly_amount: match sub.interval {
                        BillingInterval::Monthly => sub.amount,
                        BillingInterval::Annual => sub.amount / Decimal::from(12),
                    },
                    current_period_end: sub
                        .current_period_end
                        .map(|d| d.to_rfc3339())
                        .unwrap_or_default(),
                    created_at: sub.created_at.to_rfc3339(),
                })
                .map_err(|e| AppError::Internal(format!("CSV serialization failed: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV write failed: {}", e)))
    }
}

#[derive(Serialize)]
struct LedgerCsvRecord {
    org_id: Uuid,
    subscription_id: String,
    plan: String,
    status: String,
    amount: Decimal,
    interval: String,
    monthly_amount: Decimal,
    current_period_end: String,
    created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_subscription_event_fields() {
        let object = json!({
            "id": "sub_123",
            "customer": "cus_456",
            "status": "active",
            "current_period_end": 1_760_000_000,
            "items": {
                "data": [{
                    "price": {
                        "id": "price_monthly",
                        "unit_amount": 2900,
                        "recurring": { "interval": "month" }
                    }
                }]
            }
        });

        let event = BillingService::parse_subscription_event(&object).unwrap();
        assert_eq!(event.subscription_id, "sub_123");
        assert_eq!(event.customer_id, "cus_456");
        assert_eq!(event.status, SubscriptionStatus::Active);
        assert_eq!(event.amount, Decimal::new(29, 0));
        assert_eq!(event.interval, BillingInterval::Monthly);
        assert!(event.current_period_end.is_some());
    }

    #[test]
    fn maps_unpaid_to_past_due_and_yearly_to_annual() {
        let object = json!({
            "id": "sub_123",
            "customer": "cus_456",
            "status": "unpaid",
            "items": {
                "data": [{
                    "price": {
                        "id": "price_annual",
                        "unit_amount": 29000,
                        "recurring": { "interval": "year" }
                    }
                }]
            }
        });

        let event = BillingService::parse_subscription_event(&object).unwrap();
        assert_eq!(event.status, SubscriptionStatus::PastDue);
        assert_eq!(event.interval, BillingInterval::Annual);
    }

    #[test]
    fn rejects_event_without_price() {
        let object = json!({
            "id": "sub_123",
            "customer": "cus_456",
            "status": "active",
            "items": { "data": [] }
        });

        assert!(BillingService::parse_subscription_event(&object).is_err());
    }
}
