//! Billing aggregation for invoice rendering.
//!
//! Resolves an invoice into everything the document template needs: the
//! customer, one display line per attached shipment, and the outstanding
//! balance figures computed across the customer's other invoices.

use std::collections::HashMap;

use bigdecimal::{BigDecimal, Zero};
use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Customer, Invoice, InvoiceItem, Shipment};
use crate::schema::{customers, invoice_items, invoices, shipments};

/// One row of the rendered line-item table.
#[derive(Debug, Clone)]
pub struct BillingLine {
    pub description: String,
    pub weight: BigDecimal,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct BalanceSummary {
    pub total_outstanding: BigDecimal,
    pub previous_balance: BigDecimal,
    pub amount_due: BigDecimal,
}

#[derive(Debug)]
pub struct BillingStatement {
    pub invoice: Invoice,
    pub customer: Option<Customer>,
    pub lines: Vec<BillingLine>,
    pub items_subtotal: BigDecimal,
    pub previous_balance: BigDecimal,
    pub amount_due: BigDecimal,
}

fn is_unpaid(status: &str) -> bool {
    status.eq_ignore_ascii_case("pending") || status.eq_ignore_ascii_case("overdue")
}

/// Balance math over all of a customer's invoices, current one included.
///
/// When the current invoice carries no issue date the previous balance falls
/// back to `max(0, total_outstanding - amount)`. That subtraction
/// misattributes balance when several undated unpaid invoices exist; the
/// behavior is kept as-is pending a business ruling.
pub fn compute_balances(current: &Invoice, all: &[Invoice]) -> BalanceSummary {
    let total_outstanding = all
        .iter()
        .filter(|row| is_unpaid(&row.status))
        .fold(BigDecimal::zero(), |sum, row| sum + &row.amount);

    let previous_balance = match current.invoice_date {
        Some(current_date) => all
            .iter()
            .filter(|row| row.id != current.id)
            .filter(|row| is_unpaid(&row.status))
            .filter(|row| matches!(row.invoice_date, Some(date) if date < current_date))
            .fold(BigDecimal::zero(), |sum, row| sum + &row.amount),
        None => {
            let fallback = &total_outstanding - &current.amount;
            if fallback > BigDecimal::zero() {
                fallback
            } else {
                BigDecimal::zero()
            }
        }
    };

    let amount_due = if total_outstanding > BigDecimal::zero() {
        total_outstanding.clone()
    } else {
        current.amount.clone()
    };

    BalanceSummary {
        total_outstanding,
        previous_balance,
        amount_due,
    }
}

/// Builds display lines from the invoice's items, resolving each item's
/// shipment for the description and weight. Zero items with a positive
/// invoice amount synthesize a single generic line so the rendered document
/// is never empty.
pub fn build_lines(
    invoice_amount: &BigDecimal,
    items: &[InvoiceItem],
    shipments_by_id: &HashMap<Uuid, Shipment>,
) -> (Vec<BillingLine>, BigDecimal) {
    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = BigDecimal::zero();

    for (index, item) in items.iter().enumerate() {
        let shipment = item.shipment_id.and_then(|id| shipments_by_id.get(&id));

        let description = match shipment {
            Some(shipment) => {
                let route = format!("{} → {}", shipment.origin, shipment.destination);
                if route.trim() == "→" {
                    shipment.shipment_ref.clone()
                } else {
                    format!("{} | {}", shipment.shipment_ref, route)
                }
            }
            None => format!("Shipment {}", index + 1),
        };

        let weight = shipment
            .map(|s| s.weight.clone())
            .unwrap_or_else(BigDecimal::zero);

        subtotal += &item.amount;
        lines.push(BillingLine {
            description,
            weight,
            amount: item.amount.clone(),
        });
    }

    if lines.is_empty() && invoice_amount > &BigDecimal::zero() {
        subtotal = invoice_amount.clone();
        lines.push(BillingLine {
            description: "Logistics services".to_string(),
            weight: BigDecimal::zero(),
            amount: invoice_amount.clone(),
        });
    }

    (lines, subtotal)
}

/// Loads the full billing statement for one invoice. A missing invoice is
/// fatal; a missing customer or shipment degrades to blank display fields.
pub fn load_statement(conn: &mut PgConnection, invoice_id: Uuid) -> AppResult<BillingStatement> {
    let invoice: Invoice = invoices::table.find(invoice_id).first(conn)?;

    let customer: Option<Customer> = customers::table
        .find(invoice.customer_id)
        .first(conn)
        .optional()?;

    let customer_invoices: Vec<Invoice> = invoices::table
        .filter(invoices::customer_id.eq(invoice.customer_id))
        .load(conn)?;

    let items: Vec<InvoiceItem> = invoice_items::table
        .filter(invoice_items::invoice_id.eq(invoice.id))
        .order(invoice_items::created_at.asc())
        .load(conn)?;

    let shipment_ids: Vec<Uuid> = items.iter().filter_map(|item| item.shipment_id).collect();
    let shipments_by_id: HashMap<Uuid, Shipment> = if shipment_ids.is_empty() {
        HashMap::new()
    } else {
        shipments::table
            .filter(shipments::id.eq_any(&shipment_ids))
            .load::<Shipment>(conn)?
            .into_iter()
            .map(|shipment| (shipment.id, shipment))
            .collect()
    };

    let balances = compute_balances(&invoice, &customer_invoices);
    let (lines, items_subtotal) = build_lines(&invoice.amount, &items, &shipments_by_id);

    Ok(BillingStatement {
        invoice,
        customer,
        lines,
        items_subtotal,
        previous_balance: balances.previous_balance,
        amount_due: balances.amount_due,
    })
}
