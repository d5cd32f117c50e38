//! Subscription and revenue-metric models
//!
//! The admin dashboard renders MRR/ARR/NRR computed here from the
//! subscription ledger. Amounts are NZD.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing cadence of a subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Monthly,
    Annual,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Annual => "annual",
        }
    }
}

impl std::str::FromStr for BillingInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingInterval::Monthly),
            "annual" => Ok(BillingInterval::Annual),
            other => Err(format!("unknown billing interval: {}", other)),
        }
    }
}

/// Subscription status, mirroring the payment provider's states we act on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Statuses that count toward recurring revenue
    pub fn is_revenue_bearing(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::PastDue)
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(format!("unknown subscription status: {}", other)),
        }
    }
}

/// An organisation's subscription, kept in step with provider webhooks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub org_id: Uuid,
    pub provider_customer_id: String,
    pub provider_subscription_id: String,
    pub plan: String,
    pub status: SubscriptionStatus,
    /// Amount charged per billing interval
    pub amount: Decimal,
    pub interval: BillingInterval,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Amount normalised to a monthly figure
    pub fn monthly_amount(&self) -> Decimal {
        match self.interval {
            BillingInterval::Monthly => self.amount,
            BillingInterval::Annual => self.amount / Decimal::from(12),
        }
    }
}

/// Monthly recurring revenue across revenue-bearing subscriptions
pub fn compute_mrr(subscriptions: &[Subscription]) -> Decimal {
    subscriptions
        .iter()
        .filter(|s| s.status.is_revenue_bearing())
        .map(|s| s.monthly_amount())
        .sum()
}

/// Annual recurring revenue (12 x MRR)
pub fn compute_arr(subscriptions: &[Subscription]) -> Decimal {
    compute_mrr(subscriptions) * Decimal::from(12)
}

/// Net revenue retention, as a percentage.
///
/// `start` is the per-org MRR of the cohort at the window start; `current`
/// is per-org MRR now. Orgs that joined after the window start are ignored;
/// churned orgs simply contribute nothing on the current side. Returns
/// `None` when the starting cohort had no revenue.
pub fn compute_nrr(start: &[(Uuid, Decimal)], current: &[(Uuid, Decimal)]) -> Option<Decimal> {
    let start_total: Decimal = start.iter().map(|(_, mrr)| *mrr).sum();
    if start_total <= Decimal::ZERO {
        return None;
    }
    let retained: Decimal = current
        .iter()
        .filter(|(org, _)| start.iter().any(|(s, _)| s == org))
        .map(|(_, mrr)| *mrr)
        .sum();
    Some(retained / start_total * Decimal::from(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(status: SubscriptionStatus, amount: i64, interval: BillingInterval) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            provider_customer_id: "cus_test".to_string(),
            provider_subscription_id: "sub_test".to_string(),
            plan: "team".to_string(),
            status,
            amount: Decimal::from(amount),
            interval,
            current_period_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn mrr_normalises_annual_plans() {
        let subs = vec![
            sub(SubscriptionStatus::Active, 29, BillingInterval::Monthly),
            sub(SubscriptionStatus::Active, 240, BillingInterval::Annual),
        ];
        assert_eq!(compute_mrr(&subs), Decimal::from(49));
        assert_eq!(compute_arr(&subs), Decimal::from(588));
    }

    #[test]
    fn canceled_subscriptions_do_not_count() {
        let subs = vec![
            sub(SubscriptionStatus::Active, 29, BillingInterval::Monthly),
            sub(SubscriptionStatus::Canceled, 99, BillingInterval::Monthly),
            sub(SubscriptionStatus::PastDue, 10, BillingInterval::Monthly),
        ];
        // Past-due still counts until the provider cancels it
        assert_eq!(compute_mrr(&subs), Decimal::from(39));
    }

    #[test]
    fn nrr_tracks_cohort_only() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let newcomer = Uuid::new_v4();

        let start = vec![(a, Decimal::from(100)), (b, Decimal::from(100))];
        // a expanded, b churned, newcomer ignored
        let current = vec![(a, Decimal::from(150)), (newcomer, Decimal::from(500))];

        let nrr = compute_nrr(&start, &current).unwrap();
        assert_eq!(nrr, Decimal::from(75));
    }

    #[test]
    fn nrr_undefined_without_starting_revenue() {
        assert!(compute_nrr(&[], &[(Uuid::new_v4(), Decimal::from(10))]).is_none());
    }
}
