//! Barcode validation and medicine comparison tests

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{compare_medicines, ActiveIngredient, ComparisonVerdict, Medicine};
use shared::validation::{gtin13_check_digit, validate_gtin13};

/// Generate a 12-digit GTIN prefix
fn gtin_prefix_strategy() -> impl Strategy<Value = String> {
    "[0-9]{12}"
}

fn medicine(barcode: &str, ingredients: &[(&str, i64)]) -> Medicine {
    Medicine {
        id: Uuid::new_v4(),
        name: "test medicine".to_string(),
        brand: None,
        barcode: barcode.to_string(),
        ingredients: ingredients
            .iter()
            .map(|(name, mg)| ActiveIngredient {
                name: name.to_string(),
                strength_mg: Decimal::from(*mg),
            })
            .collect(),
        form: Some("tablet".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

proptest! {
    /// Appending the computed check digit always yields a valid GTIN-13
    #[test]
    fn computed_check_digit_validates(prefix in gtin_prefix_strategy()) {
        let check = gtin13_check_digit(&prefix).unwrap();
        let barcode = format!("{}{}", prefix, check);
        prop_assert!(validate_gtin13(&barcode).is_ok());
    }

    /// Any other final digit fails validation
    #[test]
    fn wrong_check_digit_fails(prefix in gtin_prefix_strategy(), offset in 1u32..10) {
        let check = gtin13_check_digit(&prefix).unwrap();
        let wrong = (check + offset) % 10;
        let barcode = format!("{}{}", prefix, wrong);
        prop_assert!(validate_gtin13(&barcode).is_err());
    }

    /// Lengths other than 13 never validate
    #[test]
    fn wrong_length_fails(barcode in "[0-9]{1,20}") {
        if barcode.len() != 13 {
            prop_assert!(validate_gtin13(&barcode).is_err());
        }
    }

    /// The comparison verdict does not depend on scan order
    #[test]
    fn comparison_is_symmetric(
        shared_count in 0usize..4,
        first_only in 0usize..3,
        second_only in 0usize..3,
    ) {
        let shared: Vec<(String, i64)> = (0..shared_count)
            .map(|n| (format!("shared{}", n), 100 + n as i64))
            .collect();

        let mut a_ingredients: Vec<(&str, i64)> =
            shared.iter().map(|(n, mg)| (n.as_str(), *mg)).collect();
        let mut b_ingredients = a_ingredients.clone();

        let a_extras: Vec<String> = (0..first_only).map(|n| format!("alpha{}", n)).collect();
        let b_extras: Vec<String> = (0..second_only).map(|n| format!("beta{}", n)).collect();
        for extra in &a_extras {
            a_ingredients.push((extra.as_str(), 50));
        }
        for extra in &b_extras {
            b_ingredients.push((extra.as_str(), 50));
        }

        let a = medicine("4006381333931", &a_ingredients);
        let b = medicine("9400547001231", &b_ingredients);

        let forward = compare_medicines(&a, &b);
        let backward = compare_medicines(&b, &a);

        prop_assert_eq!(forward.verdict, backward.verdict);
        prop_assert_eq!(forward.shared_ingredients.len(), backward.shared_ingredients.len());
        prop_assert_eq!(forward.only_in_first, backward.only_in_second);
        prop_assert_eq!(forward.only_in_second, backward.only_in_first);
    }
}

#[test]
fn ingredient_names_match_case_insensitively() {
    let a = medicine("4006381333931", &[("Paracetamol", 500)]);
    let b = medicine("9400547001231", &[("paracetamol", 500)]);
    let cmp = compare_medicines(&a, &b);
    assert_eq!(cmp.verdict, ComparisonVerdict::SameIngredients);
}

#[test]
fn strength_difference_downgrades_equivalence() {
    let a = medicine("4006381333931", &[("ibuprofen", 200)]);
    let b = medicine("9400547001231", &[("ibuprofen", 400)]);
    let cmp = compare_medicines(&a, &b);
    assert_eq!(cmp.verdict, ComparisonVerdict::OverlappingIngredients);
    assert_eq!(cmp.strength_differences.len(), 1);
}

#[test]
fn same_barcode_short_circuits() {
    let a = medicine("9400547001231", &[("loratadine", 10)]);
    let b = medicine("9400547001231", &[("cetirizine", 10)]);
    let cmp = compare_medicines(&a, &b);
    assert_eq!(cmp.verdict, ComparisonVerdict::SameMedicine);
}
