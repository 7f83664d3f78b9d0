use axum::extract::{Json, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use bigdecimal::{BigDecimal, Zero};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Customer, Invoice, InvoiceItem, NewInvoiceItem, Shipment};
use crate::pipeline::{self, GeneratedPdf};
use crate::rates::{find_rate, line_amount};
use crate::schema::{customers, invoice_generation_logs, invoice_items, invoices, shipments};
use crate::state::AppState;

#[derive(Serialize)]
pub struct InvoiceItemResponse {
    pub id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub created_at: NaiveDateTime,
}

impl From<InvoiceItem> for InvoiceItemResponse {
    fn from(item: InvoiceItem) -> Self {
        Self {
            id: item.id,
            shipment_id: item.shipment_id,
            amount: item.amount,
            created_at: item.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_ref: String,
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub amount: BigDecimal,
    pub status: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub pdf_path: Option<String>,
    pub items: Vec<InvoiceItemResponse>,
}

/// GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<InvoiceResponse>> {
    let mut conn = state.db()?;

    let invoice: Invoice = invoices::table.find(invoice_id).first(&mut conn)?;
    let customer: Option<Customer> = customers::table
        .find(invoice.customer_id)
        .first(&mut conn)
        .optional()?;
    let items: Vec<InvoiceItem> = invoice_items::table
        .filter(invoice_items::invoice_id.eq(invoice.id))
        .order(invoice_items::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(InvoiceResponse {
        id: invoice.id,
        invoice_ref: invoice.invoice_ref,
        customer_id: invoice.customer_id,
        customer_name: customer.map(|customer| customer.name),
        amount: invoice.amount,
        status: invoice.status,
        invoice_date: invoice.invoice_date,
        due_date: invoice.due_date,
        pdf_path: invoice.pdf_path,
        items: items.into_iter().map(InvoiceItemResponse::from).collect(),
    }))
}

/// POST /api/invoices/:id/pdf
pub async fn generate_pdf(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<GeneratedPdf>> {
    let generated = pipeline::generate_invoice_pdf(&state, invoice_id).await?;
    Ok(Json(generated))
}

#[derive(Deserialize)]
pub struct DownloadQuery {
    /// Specific stored artifact to fetch; defaults to the invoice's current
    /// `pdf_path`.
    pub path: Option<String>,
}

/// GET /api/invoices/:id/pdf
///
/// Streams the stored PDF bytes. Only invoices that have been generated at
/// least once have a stored document.
pub async fn download_pdf(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<impl IntoResponse> {
    let invoice: Invoice = {
        let mut conn = state.db()?;
        invoices::table.find(invoice_id).first(&mut conn)?
    };

    let pdf_path = match query.path {
        Some(path) => {
            // Keys are namespaced per invoice; reject paths outside it.
            if !path.starts_with(&format!("invoices/{invoice_id}/")) {
                return Err(AppError::bad_request(
                    "path does not belong to this invoice",
                ));
            }
            path
        }
        None => invoice.pdf_path.ok_or_else(|| {
            AppError::new(
                StatusCode::NOT_FOUND,
                "no PDF has been generated for this invoice",
            )
        })?,
    };

    let bytes = state.storage.get_object(&pdf_path).await?;

    let disposition = attachment_content_disposition(&format!("{}.pdf", invoice.invoice_ref));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

fn attachment_content_disposition(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();
    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

#[derive(Deserialize)]
pub struct AttachItemRequest {
    pub shipment_id: Uuid,
    /// Explicit charge for this item. When omitted the configured lane rate
    /// prices the shipment.
    pub amount: Option<BigDecimal>,
}

#[derive(Serialize)]
pub struct AttachItemResponse {
    pub item: InvoiceItemResponse,
    pub invoice_amount: BigDecimal,
}

/// POST /api/invoices/:id/items
pub async fn attach_item(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<AttachItemRequest>,
) -> AppResult<(StatusCode, Json<AttachItemResponse>)> {
    if let Some(amount) = &payload.amount {
        if amount < &BigDecimal::zero() {
            return Err(AppError::bad_request("item amount must not be negative"));
        }
    }

    let mut conn = state.db()?;

    let response = conn.transaction::<_, AppError, _>(|conn| {
        let invoice: Invoice = invoices::table
            .find(invoice_id)
            .for_update()
            .first(conn)?;

        let shipment: Shipment = shipments::table
            .find(payload.shipment_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::bad_request("shipment does not exist"))?;

        let amount = match payload.amount.clone() {
            Some(amount) => amount,
            None => {
                let rate = find_rate(
                    conn,
                    &shipment.origin,
                    &shipment.destination,
                    &shipment.service_type,
                )?
                .ok_or_else(|| {
                    AppError::bad_request(format!(
                        "no rate configured for {} → {} ({})",
                        shipment.origin, shipment.destination, shipment.service_type
                    ))
                })?;
                line_amount(&rate, &shipment.weight)
            }
        };

        let new_item = NewInvoiceItem {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            shipment_id: Some(shipment.id),
            amount: amount.clone(),
        };
        let item: InvoiceItem = diesel::insert_into(invoice_items::table)
            .values(&new_item)
            .get_result(conn)?;

        let invoice_amount = &invoice.amount + &amount;
        diesel::update(invoices::table.find(invoice.id))
            .set((
                invoices::amount.eq(&invoice_amount),
                invoices::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        Ok(AttachItemResponse {
            item: item.into(),
            invoice_amount,
        })
    })?;

    info!(
        invoice_id = %invoice_id,
        shipment_id = %payload.shipment_id,
        amount = %response.item.amount,
        "attached shipment to invoice"
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /api/invoices/:id
///
/// Refuses while line items are attached; generation logs go with the
/// invoice.
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    conn.transaction::<_, AppError, _>(|conn| {
        let invoice: Invoice = invoices::table.find(invoice_id).first(conn)?;

        let item_count: i64 = invoice_items::table
            .filter(invoice_items::invoice_id.eq(invoice.id))
            .count()
            .get_result(conn)?;
        if item_count > 0 {
            return Err(AppError::conflict(format!(
                "invoice has {item_count} attached item(s); detach them first"
            )));
        }

        diesel::delete(
            invoice_generation_logs::table
                .filter(invoice_generation_logs::invoice_id.eq(invoice.id)),
        )
        .execute(conn)?;
        diesel::delete(invoices::table.find(invoice.id)).execute(conn)?;
        Ok(())
    })?;

    info!(invoice_id = %invoice_id, "deleted invoice");
    Ok(StatusCode::NO_CONTENT)
}
