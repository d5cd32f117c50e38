//! Salvage marketplace listing models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::MediaReference;

/// Condition of a salvaged material
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingCondition {
    AsNew,
    Good,
    Weathered,
    ForParts,
}

impl ListingCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCondition::AsNew => "as_new",
            ListingCondition::Good => "good",
            ListingCondition::Weathered => "weathered",
            ListingCondition::ForParts => "for_parts",
        }
    }
}

impl std::str::FromStr for ListingCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as_new" => Ok(ListingCondition::AsNew),
            "good" => Ok(ListingCondition::Good),
            "weathered" => Ok(ListingCondition::Weathered),
            "for_parts" => Ok(ListingCondition::ForParts),
            other => Err(format!("unknown condition: {}", other)),
        }
    }
}

/// Listing lifecycle: active -> reserved -> sold, with release back to
/// active. Sold is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Reserved,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Reserved => "reserved",
            ListingStatus::Sold => "sold",
        }
    }

    /// Whether the listing may move from `self` to `next`
    pub fn can_transition_to(&self, next: ListingStatus) -> bool {
        matches!(
            (self, next),
            (ListingStatus::Active, ListingStatus::Reserved)
                | (ListingStatus::Reserved, ListingStatus::Active)
                | (ListingStatus::Reserved, ListingStatus::Sold)
                | (ListingStatus::Active, ListingStatus::Sold)
        )
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "reserved" => Ok(ListingStatus::Reserved),
            "sold" => Ok(ListingStatus::Sold),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A salvage-materials listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    /// Material category, e.g. "timber", "roofing", "joinery"
    pub category: String,
    pub condition: ListingCondition,
    pub quantity: i32,
    /// Unit of sale, e.g. "lm", "m2", "each"
    pub unit: String,
    /// Asking price in NZD
    pub price: Decimal,
    pub region: String,
    pub description: Option<String>,
    pub photos: Vec<MediaReference>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_edges() {
        use ListingStatus::*;
        assert!(Active.can_transition_to(Reserved));
        assert!(Active.can_transition_to(Sold));
        assert!(Reserved.can_transition_to(Active));
        assert!(Reserved.can_transition_to(Sold));
        // Sold is terminal
        assert!(!Sold.can_transition_to(Active));
        assert!(!Sold.can_transition_to(Reserved));
        // No self loops
        assert!(!Active.can_transition_to(Active));
        assert!(!Reserved.can_transition_to(Reserved));
    }

    #[test]
    fn condition_round_trip() {
        use std::str::FromStr;
        for c in [
            ListingCondition::AsNew,
            ListingCondition::Good,
            ListingCondition::Weathered,
            ListingCondition::ForParts,
        ] {
            assert_eq!(ListingCondition::from_str(c.as_str()).unwrap(), c);
        }
    }
}
