//! Revenue metric tests
//!
//! MRR/ARR/NRR are pure functions over the subscription ledger; the admin
//! dashboard and the finance export both rely on these identities.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    compute_arr, compute_mrr, compute_nrr, BillingInterval, Subscription, SubscriptionStatus,
};

fn subscription(
    status: SubscriptionStatus,
    amount: i64,
    interval: BillingInterval,
) -> Subscription {
    Subscription {
        id: Uuid::new_v4(),
        org_id: Uuid::new_v4(),
        provider_customer_id: "cus_test".to_string(),
        provider_subscription_id: format!("sub_{}", Uuid::new_v4()),
        plan: "team".to_string(),
        status,
        amount: Decimal::from(amount),
        interval,
        current_period_end: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn status_strategy() -> impl Strategy<Value = SubscriptionStatus> {
    prop_oneof![
        Just(SubscriptionStatus::Active),
        Just(SubscriptionStatus::PastDue),
        Just(SubscriptionStatus::Canceled),
    ]
}

fn interval_strategy() -> impl Strategy<Value = BillingInterval> {
    prop_oneof![
        Just(BillingInterval::Monthly),
        Just(BillingInterval::Annual),
    ]
}

proptest! {
    /// ARR is exactly twelve times MRR
    #[test]
    fn arr_is_twelve_mrr(
        specs in proptest::collection::vec(
            (status_strategy(), 1i64..1000, interval_strategy()),
            0..20,
        ),
    ) {
        let subs: Vec<Subscription> = specs
            .into_iter()
            .map(|(status, amount, interval)| subscription(status, amount, interval))
            .collect();

        prop_assert_eq!(compute_arr(&subs), compute_mrr(&subs) * Decimal::from(12));
    }

    /// Canceled subscriptions contribute nothing to MRR
    #[test]
    fn canceled_subscriptions_are_free(
        amounts in proptest::collection::vec(1i64..1000, 0..10),
    ) {
        let subs: Vec<Subscription> = amounts
            .iter()
            .map(|&a| subscription(SubscriptionStatus::Canceled, a, BillingInterval::Monthly))
            .collect();

        prop_assert_eq!(compute_mrr(&subs), Decimal::ZERO);
    }

    /// MRR is the sum of monthly-normalised amounts of revenue-bearing rows
    #[test]
    fn mrr_matches_manual_sum(
        specs in proptest::collection::vec(
            (status_strategy(), 1i64..1000, interval_strategy()),
            0..20,
        ),
    ) {
        let subs: Vec<Subscription> = specs
            .into_iter()
            .map(|(status, amount, interval)| subscription(status, amount, interval))
            .collect();

        let expected: Decimal = subs
            .iter()
            .filter(|s| s.status.is_revenue_bearing())
            .map(|s| s.monthly_amount())
            .sum();

        prop_assert_eq!(compute_mrr(&subs), expected);
    }

    /// Orgs that joined after the window start never influence NRR
    #[test]
    fn nrr_ignores_newcomers(
        cohort_mrr in 1i64..1000,
        newcomer_mrr in 1i64..10_000,
    ) {
        let org = Uuid::new_v4();
        let newcomer = Uuid::new_v4();

        let start = vec![(org, Decimal::from(cohort_mrr))];
        let with_newcomer = vec![
            (org, Decimal::from(cohort_mrr)),
            (newcomer, Decimal::from(newcomer_mrr)),
        ];
        let without = vec![(org, Decimal::from(cohort_mrr))];

        prop_assert_eq!(
            compute_nrr(&start, &with_newcomer),
            compute_nrr(&start, &without)
        );
    }
}

#[test]
fn annual_plans_normalise_to_monthly() {
    let subs = vec![subscription(
        SubscriptionStatus::Active,
        240,
        BillingInterval::Annual,
    )];
    assert_eq!(compute_mrr(&subs), Decimal::from(20));
    assert_eq!(compute_arr(&subs), Decimal::from(240));
}

#[test]
fn past_due_still_counts_until_canceled() {
    let subs = vec![
        subscription(SubscriptionStatus::Active, 29, BillingInterval::Monthly),
        subscription(SubscriptionStatus::PastDue, 29, BillingInterval::Monthly),
        subscription(SubscriptionStatus::Canceled, 29, BillingInterval::Monthly),
    ];
    assert_eq!(compute_mrr(&subs), Decimal::from(58));
}

#[test]
fn nrr_full_retention_is_one_hundred() {
    let org = Uuid::new_v4();
    let cohort = vec![(org, Decimal::from(100))];
    assert_eq!(compute_nrr(&cohort, &cohort), Some(Decimal::from(100)));
}

#[test]
fn nrr_churn_and_expansion() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let start = vec![(a, Decimal::from(100)), (b, Decimal::from(100))];

    // a doubled, b churned: retained 200 of starting 200
    let current = vec![(a, Decimal::from(200))];
    assert_eq!(compute_nrr(&start, &current), Some(Decimal::from(100)));

    // a flat, b churned: 100 / 200 = 50%
    let current = vec![(a, Decimal::from(100))];
    assert_eq!(compute_nrr(&start, &current), Some(Decimal::from(50)));
}

#[test]
fn nrr_undefined_for_empty_cohort() {
    assert!(compute_nrr(&[], &[]).is_none());
}
