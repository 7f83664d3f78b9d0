use axum::extract::{Path, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Customer;
use crate::schema::{customers, invoices, shipments};
use crate::state::AppState;

/// DELETE /api/customers/:id
///
/// A customer with shipments or invoices on record cannot be removed; the
/// caller must reassign or delete those first.
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    conn.transaction::<_, AppError, _>(|conn| {
        let customer: Customer = customers::table.find(customer_id).first(conn)?;

        let shipment_count: i64 = shipments::table
            .filter(shipments::customer_id.eq(customer.id))
            .count()
            .get_result(conn)?;
        let invoice_count: i64 = invoices::table
            .filter(invoices::customer_id.eq(customer.id))
            .count()
            .get_result(conn)?;

        if shipment_count > 0 || invoice_count > 0 {
            return Err(AppError::conflict(format!(
                "customer has {shipment_count} shipment(s) and {invoice_count} invoice(s) on record"
            )));
        }

        diesel::delete(customers::table.find(customer.id)).execute(conn)?;
        Ok(())
    })?;

    info!(customer_id = %customer_id, "deleted customer");
    Ok(StatusCode::NO_CONTENT)
}
