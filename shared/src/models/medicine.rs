//! Medicine catalogue and barcode-comparison models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An active ingredient with its strength
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveIngredient {
    pub name: String,
    pub strength_mg: Decimal,
}

/// A medicine in the comparison catalogue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    /// GTIN-13 retail barcode
    pub barcode: String,
    pub ingredients: Vec<ActiveIngredient>,
    /// Dose form, e.g. "tablet", "capsule", "liquid"
    pub form: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Verdict of comparing two scanned medicines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonVerdict {
    /// Same barcode scanned twice
    SameMedicine,
    /// Same ingredient set at the same strengths (generic equivalents)
    SameIngredients,
    /// Ingredient sets overlap but differ
    OverlappingIngredients,
    /// No ingredients in common
    Different,
}

/// Strength difference for an ingredient both medicines contain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrengthDifference {
    pub ingredient: String,
    pub first_strength_mg: Decimal,
    pub second_strength_mg: Decimal,
}

/// Result of comparing two medicines by barcode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineComparison {
    pub verdict: ComparisonVerdict,
    /// Ingredients present in both, matched case-insensitively by name
    pub shared_ingredients: Vec<String>,
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
    /// Shared ingredients whose strengths differ
    pub strength_differences: Vec<StrengthDifference>,
}

/// Compare two medicines the way the scanner screen does: ingredient overlap
/// first, then strength differences within the overlap.
pub fn compare_medicines(first: &Medicine, second: &Medicine) -> MedicineComparison {
    if first.barcode == second.barcode {
        return MedicineComparison {
            verdict: ComparisonVerdict::SameMedicine,
            shared_ingredients: first.ingredients.iter().map(|i| i.name.clone()).collect(),
            only_in_first: vec![],
            only_in_second: vec![],
            strength_differences: vec![],
        };
    }

    let mut shared = Vec::new();
    let mut only_in_first = Vec::new();
    let mut strength_differences = Vec::new();

    for a in &first.ingredients {
        match second
            .ingredients
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(&a.name))
        {
            Some(b) => {
                shared.push(a.name.clone());
                if a.strength_mg != b.strength_mg {
                    strength_differences.push(StrengthDifference {
                        ingredient: a.name.clone(),
                        first_strength_mg: a.strength_mg,
                        second_strength_mg: b.strength_mg,
                    });
                }
            }
            None => only_in_first.push(a.name.clone()),
        }
    }

    let only_in_second: Vec<String> = second
        .ingredients
        .iter()
        .filter(|b| {
            !first
                .ingredients
                .iter()
                .any(|a| a.name.eq_ignore_ascii_case(&b.name))
        })
        .map(|b| b.name.clone())
        .collect();

    let verdict = if shared.is_empty() {
        ComparisonVerdict::Different
    } else if only_in_first.is_empty() && only_in_second.is_empty() {
        if strength_differences.is_empty() {
            ComparisonVerdict::SameIngredients
        } else {
            ComparisonVerdict::OverlappingIngredients
        }
    } else {
        ComparisonVerdict::OverlappingIngredients
    };

    MedicineComparison {
        verdict,
        shared_ingredients: shared,
        only_in_first,
        only_in_second,
        strength_differences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(barcode: &str, ingredients: &[(&str, i64)]) -> Medicine {
        Medicine {
            id: Uuid::new_v4(),
            name: "test".to_string(),
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

    #[test]
    fn same_barcode_is_same_medicine() {
        let a = medicine("9400547001231", &[("paracetamol", 500)]);
        let b = medicine("9400547001231", &[("paracetamol", 500)]);
        let cmp = compare_medicines(&a, &b);
        assert_eq!(cmp.verdict, ComparisonVerdict::SameMedicine);
    }

    #[test]
    fn generic_equivalents_match() {
        let a = medicine("4006381333931", &[("paracetamol", 500)]);
        let b = medicine("9400547001231", &[("Paracetamol", 500)]);
        let cmp = compare_medicines(&a, &b);
        assert_eq!(cmp.verdict, ComparisonVerdict::SameIngredients);
        assert_eq!(cmp.shared_ingredients, vec!["paracetamol"]);
        assert!(cmp.strength_differences.is_empty());
    }

    #[test]
    fn same_ingredient_different_strength() {
        let a = medicine("4006381333931", &[("ibuprofen", 200)]);
        let b = medicine("9400547001231", &[("ibuprofen", 400)]);
        let cmp = compare_medicines(&a, &b);
        assert_eq!(cmp.verdict, ComparisonVerdict::OverlappingIngredients);
        assert_eq!(cmp.strength_differences.len(), 1);
        assert_eq!(cmp.strength_differences[0].first_strength_mg, Decimal::from(200));
    }

    #[test]
    fn partial_overlap() {
        let a = medicine(
            "4006381333931",
            &[("paracetamol", 500), ("codeine", 8)],
        );
        let b = medicine("9400547001231", &[("paracetamol", 500)]);
        let cmp = compare_medicines(&a, &b);
        assert_eq!(cmp.verdict, ComparisonVerdict::OverlappingIngredients);
        assert_eq!(cmp.only_in_first, vec!["codeine"]);
        assert!(cmp.only_in_second.is_empty());
    }

    #[test]
    fn disjoint_ingredients_are_different() {
        let a = medicine("4006381333931", &[("loratadine", 10)]);
        let b = medicine("9400547001231", &[("cetirizine", 10)]);
        let cmp = compare_medicines(&a, &b);
        assert_eq!(cmp.verdict, ComparisonVerdict::Different);
        assert!(cmp.shared_ingredients.is_empty());
    }
}
