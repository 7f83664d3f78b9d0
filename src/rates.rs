//! Pricing-lane lookup for invoice line items.
//!
//! Rates are keyed by (origin, destination, service type); a `service_type`
//! of `"any"` acts as a wildcard lane. The lookup tie-break is deliberate:
//! an exact service-type match always outranks the wildcard, and within a
//! tier the most recently created rate wins.

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::PgConnection;

use crate::error::AppResult;
use crate::models::Rate;
use crate::schema::rates;

pub const SERVICE_TYPE_ANY: &str = "any";

/// Picks the effective rate from candidates already filtered to one lane.
pub fn pick_rate(candidates: &[Rate], service_type: &str) -> Option<Rate> {
    let exact = candidates
        .iter()
        .filter(|rate| rate.service_type.eq_ignore_ascii_case(service_type))
        .max_by_key(|rate| rate.created_at);

    exact
        .or_else(|| {
            candidates
                .iter()
                .filter(|rate| rate.service_type.eq_ignore_ascii_case(SERVICE_TYPE_ANY))
                .max_by_key(|rate| rate.created_at)
        })
        .cloned()
}

pub fn find_rate(
    conn: &mut PgConnection,
    origin: &str,
    destination: &str,
    service_type: &str,
) -> AppResult<Option<Rate>> {
    let candidates: Vec<Rate> = rates::table
        .filter(rates::origin.eq(origin))
        .filter(rates::destination.eq(destination))
        .load(conn)?;

    Ok(pick_rate(&candidates, service_type))
}

/// Charge for a shipment on a lane: base fee plus the per-kg rate applied to
/// the billable weight, which never drops below the lane minimum.
pub fn line_amount(rate: &Rate, weight: &BigDecimal) -> BigDecimal {
    let billable = if weight < &rate.min_weight {
        rate.min_weight.clone()
    } else {
        weight.clone()
    };
    &rate.base_fee + &rate.rate_per_kg * billable
}
