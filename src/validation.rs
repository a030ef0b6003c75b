use rust_decimal::Decimal;

use crate::models::{BuyWagerRequest, CreateWagerRequest};

/// Field rules for listing a wager. Violations render in field order.
pub fn validate_create_wager(req: &CreateWagerRequest) -> Vec<String> {
    let mut violations = Vec::new();

    if req.total_wager_value <= 0 {
        violations.push(larger_than("total_wager_value", 0));
    }
    if req.odds <= 0 {
        violations.push(larger_than("odds", 0));
    }
    if req.selling_percentage < 1 {
        violations.push(larger_than_or_equal("selling_percentage", 1));
    }
    if req.selling_percentage > 100 {
        violations.push(less_than_or_equal("selling_percentage", 100));
    }
    if req.selling_price <= Decimal::ZERO {
        violations.push(larger_than("selling_price", 0));
    }
    if !monetary_format(req.selling_price) {
        violations.push(monetary("selling_price"));
    }

    violations
}

/// Cross-field rule for listings: the asking price must exceed the offered
/// share of the face value.
pub fn validate_placement_price(req: &CreateWagerRequest) -> Option<String> {
    let offered = Decimal::from(req.total_wager_value) * Decimal::from(req.selling_percentage)
        / Decimal::ONE_HUNDRED;
    if req.selling_price <= offered {
        return Some(
            "selling_price must be larger than total_wager_value * selling_percentage / 100"
                .to_string(),
        );
    }
    None
}

/// Field rules for buying a fraction of a wager.
pub fn validate_buy_wager(wager_id: i64, req: &BuyWagerRequest) -> Vec<String> {
    let mut violations = Vec::new();

    if wager_id <= 0 {
        violations.push(larger_than("wager_id", 0));
    }
    if req.buying_price <= Decimal::ZERO {
        violations.push(larger_than("buying_price", 0));
    }
    if !monetary_format(req.buying_price) {
        violations.push(monetary("buying_price"));
    }

    violations
}

/// Pagination rules for the listing endpoint.
pub fn validate_listing_query(page: i64, limit: i64) -> Vec<String> {
    let mut violations = Vec::new();

    if page <= 0 {
        violations.push(larger_than("page", 0));
    }
    if limit <= 0 {
        violations.push(larger_than("limit", 0));
    }

    violations
}

/// At most two decimal places. A cents multiplication would overflow near
/// `Decimal::MAX`, so the check compares against the rounded value.
fn monetary_format(value: Decimal) -> bool {
    value.round_dp(2) == value
}

fn larger_than(field: &str, param: i64) -> String {
    format!("{field} must be larger than {param}")
}

fn larger_than_or_equal(field: &str, param: i64) -> String {
    format!("{field} must be larger than or equal {param}")
}

fn less_than_or_equal(field: &str, param: i64) -> String {
    format!("{field} must be less than or equal {param}")
}

fn monetary(field: &str) -> String {
    format!("{field} must be in monetary format with maximum 2 decimal places")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
