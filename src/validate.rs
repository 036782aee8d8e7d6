//! Record validation: one raw tabular row → typed [`Product`] or a rejection.
//!
//! Validation is a pure function; rejects are returned, never raised.
//! Numeric noise in optional fields is dropped to `None` rather than
//! rejecting the whole record, so a messy export still ingests.

use crate::product::{Product, RawRecord};
use tracing::warn;

/// Why a raw record was rejected. First failing rule wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// `id` missing or not convertible to an integer.
    InvalidId,
    /// `name` missing or empty after trimming.
    MissingName,
    /// `id` already seen in the current run (detected at pipeline level).
    DuplicateId(u64),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InvalidId => write!(f, "invalid id"),
            RejectReason::MissingName => write!(f, "missing name"),
            RejectReason::DuplicateId(id) => write!(f, "duplicate id {id}"),
        }
    }
}

/// Validates one raw record.
///
/// Rules, in order:
/// 1. `id` must parse as a non-negative integer.
/// 2. `name` must be non-empty after trimming.
/// 3. Optional numeric fields are coerced leniently; unparseable values
///    become `None`.
pub fn validate_record(raw: &RawRecord) -> Result<Product, RejectReason> {
    let id = cell(raw, "id")
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(RejectReason::InvalidId)?;

    let name = cell(raw, "name").ok_or(RejectReason::MissingName)?;

    let product = Product {
        id,
        name: name.to_string(),
        main_category: cell(raw, "main_category").map(str::to_string),
        sub_category: cell(raw, "sub_category").map(str::to_string),
        image: cell(raw, "image").map(str::to_string),
        link: cell(raw, "link").map(str::to_string),
        ratings: cell(raw, "ratings").and_then(parse_rating),
        no_of_ratings: cell(raw, "no_of_ratings").and_then(parse_count),
        discount_price: cell(raw, "discount_price").and_then(parse_price),
        actual_price: cell(raw, "actual_price").and_then(parse_price),
    };

    // Lenient by design: a discount above list price is suspicious but not fatal.
    if let (Some(d), Some(a)) = (product.discount_price, product.actual_price) {
        if d > a {
            warn!(
                "product {}: discount_price {} exceeds actual_price {}",
                product.id, d, a
            );
        }
    }

    Ok(product)
}

/// Returns the trimmed cell value, treating empty strings and pandas
/// artifacts (`nan`, `None`) as absent.
fn cell<'a>(raw: &'a RawRecord, key: &str) -> Option<&'a str> {
    let v = raw.get(key)?.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("nan") || v == "None" {
        None
    } else {
        Some(v)
    }
}

/// Parses ratings like `"4.1"` or `"4.1 out of 5 stars"`; out-of-range
/// values are noise, not errors.
fn parse_rating(s: &str) -> Option<f32> {
    let first = s.split_whitespace().next()?;
    let r = first.parse::<f32>().ok()?;
    (0.0..=5.0).contains(&r).then_some(r)
}

/// Parses counts like `"1,234"`.
fn parse_count(s: &str) -> Option<u64> {
    s.replace(',', "").parse::<u64>().ok()
}

/// Parses prices like `"₹1,099"`, `"$19.99"` or `"399"`.
fn parse_price(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn valid_row_becomes_product() {
        let r = row(&[
            ("id", "42"),
            ("name", "  USB-C Hub "),
            ("main_category", "Electronics"),
            ("ratings", "4.1"),
            ("no_of_ratings", "1,234"),
            ("discount_price", "₹1,099"),
            ("actual_price", "₹1,999"),
        ]);
        let p = validate_record(&r).unwrap();
        assert_eq!(p.id, 42);
        assert_eq!(p.name, "USB-C Hub");
        assert_eq!(p.main_category.as_deref(), Some("Electronics"));
        assert_eq!(p.ratings, Some(4.1));
        assert_eq!(p.no_of_ratings, Some(1234));
        assert_eq!(p.discount_price, Some(1099.0));
        assert_eq!(p.actual_price, Some(1999.0));
    }

    #[test]
    fn invalid_id_wins_over_missing_name() {
        let r = row(&[("id", "abc"), ("name", "")]);
        assert_eq!(validate_record(&r), Err(RejectReason::InvalidId));
    }

    #[test]
    fn missing_or_blank_name_is_rejected() {
        assert_eq!(
            validate_record(&row(&[("id", "1")])),
            Err(RejectReason::MissingName)
        );
        assert_eq!(
            validate_record(&row(&[("id", "1"), ("name", "   ")])),
            Err(RejectReason::MissingName)
        );
        assert_eq!(
            validate_record(&row(&[("id", "1"), ("name", "nan")])),
            Err(RejectReason::MissingName)
        );
    }

    #[test]
    fn numeric_noise_is_dropped_not_fatal() {
        let r = row(&[
            ("id", "7"),
            ("name", "Desk Lamp"),
            ("ratings", "great!"),
            ("no_of_ratings", "many"),
            ("discount_price", "call us"),
            ("actual_price", "n/a"),
        ]);
        let p = validate_record(&r).unwrap();
        assert_eq!(p.ratings, None);
        assert_eq!(p.no_of_ratings, None);
        assert_eq!(p.discount_price, None);
        assert_eq!(p.actual_price, None);
    }

    #[test]
    fn out_of_range_rating_is_noise() {
        let r = row(&[("id", "7"), ("name", "Desk Lamp"), ("ratings", "9.5")]);
        assert_eq!(validate_record(&r).unwrap().ratings, None);
    }

    #[test]
    fn rating_with_suffix_text_parses() {
        let r = row(&[
            ("id", "7"),
            ("name", "Desk Lamp"),
            ("ratings", "4.5 out of 5 stars"),
        ]);
        assert_eq!(validate_record(&r).unwrap().ratings, Some(4.5));
    }

    #[test]
    fn discount_above_list_price_passes() {
        let r = row(&[
            ("id", "7"),
            ("name", "Desk Lamp"),
            ("discount_price", "30"),
            ("actual_price", "20"),
        ]);
        let p = validate_record(&r).unwrap();
        assert_eq!(p.discount_price, Some(30.0));
        assert_eq!(p.actual_price, Some(20.0));
    }

    #[test]
    fn validation_is_pure() {
        let r = row(&[("id", "9"), ("name", "Monitor"), ("ratings", "bad")]);
        assert_eq!(validate_record(&r), validate_record(&r));
        let bad = row(&[("id", "x")]);
        assert_eq!(validate_record(&bad), validate_record(&bad));
    }

    #[test]
    fn unknown_columns_are_ignored() {
        let r = row(&[("id", "3"), ("name", "Chair"), ("warehouse", "B-12")]);
        assert!(validate_record(&r).is_ok());
    }
}
