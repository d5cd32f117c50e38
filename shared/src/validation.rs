//! Validation utilities for the Sitebook platform
//!
//! Pure checks shared by the backend and the browser apps (via WASM), so a
//! record rejected offline is rejected for the same reason online.

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Logbook entry validations
// ============================================================================

/// Validate hours logged against a single entry (more than 0, at most 24)
pub fn validate_entry_hours(hours: Decimal) -> Result<(), &'static str> {
    if hours <= Decimal::ZERO {
        return Err("Hours must be greater than 0");
    }
    if hours > Decimal::from(24) {
        return Err("Hours cannot exceed 24 for a single day");
    }
    Ok(())
}

/// Validate the work date is not in the future
pub fn validate_work_date(work_date: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if work_date > today {
        return Err("Work date cannot be in the future");
    }
    Ok(())
}

/// Validate the entry description is present
pub fn validate_description(description: &str) -> Result<(), &'static str> {
    if description.trim().is_empty() {
        return Err("Description is required");
    }
    Ok(())
}

// ============================================================================
// Medicine barcode validations
// ============================================================================

/// Validate a GTIN-13 barcode (13 digits with a correct check digit)
pub fn validate_gtin13(barcode: &str) -> Result<(), &'static str> {
    if barcode.len() != 13 {
        return Err("Barcode must be exactly 13 digits");
    }
    let mut digits = Vec::with_capacity(13);
    for c in barcode.chars() {
        match c.to_digit(10) {
            Some(d) => digits.push(d),
            None => return Err("Barcode must contain only digits"),
        }
    }

    // Check digit: weighted sum of the first 12 digits (weights 1,3,1,3,...)
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { *d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;

    if digits[12] != check {
        return Err("Barcode check digit does not match");
    }
    Ok(())
}

/// Compute the GTIN-13 check digit for a 12-digit prefix
pub fn gtin13_check_digit(prefix: &str) -> Option<u32> {
    if prefix.len() != 12 || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let sum: u32 = prefix
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let d = c.to_digit(10).unwrap_or(0);
            if i % 2 == 0 {
                d
            } else {
                d * 3
            }
        })
        .sum();
    Some((10 - sum % 10) % 10)
}

// ============================================================================
// Marketplace validations
// ============================================================================

/// Validate a listing price (positive, at most two decimal places)
pub fn validate_listing_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Price must be greater than 0");
    }
    if price.scale() > 2 {
        return Err("Price cannot have more than two decimal places");
    }
    Ok(())
}

/// Validate a listing quantity
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

// ============================================================================
// Account validations
// ============================================================================

/// Validate an organisation code (3-10 uppercase alphanumeric characters)
pub fn validate_org_code(code: &str) -> Result<(), &'static str> {
    let len = code.chars().count();
    if !(3..=10).contains(&len) {
        return Err("Organisation code must be 3-10 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err("Organisation code must be uppercase letters and digits");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email address")
    }
}

/// Validate a password meets the minimum policy
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_hours_bounds() {
        assert!(validate_entry_hours(Decimal::new(85, 1)).is_ok()); // 8.5
        assert!(validate_entry_hours(Decimal::from(24)).is_ok());
        assert!(validate_entry_hours(Decimal::ZERO).is_err());
        assert!(validate_entry_hours(Decimal::from(-1)).is_err());
        assert!(validate_entry_hours(Decimal::new(245, 1)).is_err()); // 24.5
    }

    #[test]
    fn work_date_not_in_future() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert!(validate_work_date(today, today).is_ok());
        assert!(validate_work_date(today.pred_opt().unwrap(), today).is_ok());
        assert!(validate_work_date(today.succ_opt().unwrap(), today).is_err());
    }

    #[test]
    fn gtin13_accepts_valid_codes() {
        // Real-world GTIN-13s with valid check digits
        assert!(validate_gtin13("9400547001231").is_ok());
        assert!(validate_gtin13("4006381333931").is_ok());
    }

    #[test]
    fn gtin13_rejects_bad_input() {
        assert!(validate_gtin13("9400547001234").is_err()); // wrong check digit
        assert!(validate_gtin13("940054700123").is_err()); // 12 digits
        assert!(validate_gtin13("94005470012345").is_err()); // 14 digits
        assert!(validate_gtin13("94005470O1234").is_err()); // letter O
    }

    #[test]
    fn check_digit_matches_validator() {
        let check = gtin13_check_digit("400638133393").unwrap();
        assert_eq!(check, 1);
        assert!(gtin13_check_digit("40063813339").is_none());
    }

    #[test]
    fn listing_price_rules() {
        assert!(validate_listing_price(Decimal::new(4999, 2)).is_ok()); // 49.99
        assert!(validate_listing_price(Decimal::ZERO).is_err());
        assert!(validate_listing_price(Decimal::new(49999, 3)).is_err()); // 49.999
    }

    #[test]
    fn org_code_rules() {
        assert!(validate_org_code("BCH").is_ok());
        assert!(validate_org_code("SITE01").is_ok());
        assert!(validate_org_code("ab").is_err());
        assert!(validate_org_code("lowercase").is_err());
        assert!(validate_org_code("TOOLONGCODE1").is_err());
    }
}
