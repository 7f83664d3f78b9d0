//! Invoice PDF generation pipeline.
//!
//! One generation attempt is one `invoice_generation_logs` row: inserted as
//! `pending` before rendering starts and resolved to `success` or `failed`
//! with a duration when the attempt ends. Three failed attempts in a row
//! escalate to the failure webhook.

use std::time::Duration;

use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::alerts::InvoiceFailureAlert;
use crate::billing::{load_statement, BillingStatement};
use crate::error::{AppError, AppResult};
use crate::models::{GenerationLog, NewGenerationLog};
use crate::schema::{invoice_generation_logs, invoices};
use crate::state::AppState;
use crate::template::render_invoice;

const STORAGE_PREFIX: &str = "invoices";

pub const LOG_STATUS_PENDING: &str = "pending";
pub const LOG_STATUS_SUCCESS: &str = "success";
pub const LOG_STATUS_FAILED: &str = "failed";

/// Consecutive failed attempts that trigger an alert.
const ALERT_FAILURE_WINDOW: i64 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPdf {
    pub pdf_path: String,
    pub pdf_url: String,
}

/// Renders, uploads, and records one invoice PDF. Returns the stored object
/// key and a signed download URL.
pub async fn generate_invoice_pdf(state: &AppState, invoice_id: Uuid) -> AppResult<GeneratedPdf> {
    let started = Utc::now();

    let statement = {
        let mut conn = state.db()?;
        load_statement(&mut conn, invoice_id)?
    };

    let log_id = {
        let mut conn = state.db()?;
        insert_pending_log(&mut conn, invoice_id)?
    };

    match run_generation(state, &statement).await {
        Ok(generated) => {
            let duration_ms = (Utc::now() - started).num_milliseconds();
            let mut conn = state.db()?;
            resolve_log(
                &mut conn,
                log_id,
                LOG_STATUS_SUCCESS,
                "Invoice PDF generated successfully",
                duration_ms,
            )?;
            info!(
                invoice_id = %invoice_id,
                pdf_path = %generated.pdf_path,
                duration_ms,
                "generated invoice PDF"
            );
            Ok(generated)
        }
        Err(err) => {
            let duration_ms = (Utc::now() - started).num_milliseconds();
            error!(
                invoice_id = %invoice_id,
                error = %err,
                duration_ms,
                "invoice PDF generation failed"
            );

            if let Err(log_err) = state.db().and_then(|mut conn| {
                resolve_log(&mut conn, log_id, LOG_STATUS_FAILED, err.message(), duration_ms)
            }) {
                error!(
                    invoice_id = %invoice_id,
                    error = %log_err,
                    "failed to record generation failure"
                );
            }

            maybe_alert_on_repeated_failures(state, &statement, err.message()).await;

            Err(err)
        }
    }
}

async fn run_generation(state: &AppState, statement: &BillingStatement) -> AppResult<GeneratedPdf> {
    let invoice = &statement.invoice;

    let html = render_invoice(statement, &state.config)?;
    let pdf = state.renderer.render_pdf(&html).await?;

    let pdf_path = format!(
        "{STORAGE_PREFIX}/{}/{}.pdf",
        invoice.id,
        Utc::now().timestamp_millis()
    );
    state
        .storage
        .put_object(&pdf_path, pdf, "application/pdf")
        .await?;

    // Old artifacts are garbage once the pointer moves; removal is best-effort.
    if let Some(previous) = invoice.pdf_path.as_deref().filter(|old| *old != pdf_path) {
        if let Err(err) = state.storage.delete_object(previous).await {
            warn!(
                invoice_id = %invoice.id,
                pdf_path = %previous,
                error = %err,
                "failed to delete superseded invoice PDF"
            );
        }
    }

    {
        let mut conn = state.db()?;
        update_pdf_path(&mut conn, invoice.id, &pdf_path)?;
    }

    let pdf_url = state
        .storage
        .presign_get_object(
            &pdf_path,
            Duration::from_secs(state.config.signed_url_ttl_seconds),
        )
        .await?;

    Ok(GeneratedPdf { pdf_path, pdf_url })
}

fn insert_pending_log(conn: &mut PgConnection, invoice_id: Uuid) -> AppResult<Uuid> {
    let log = NewGenerationLog {
        id: Uuid::new_v4(),
        invoice_id,
        status: LOG_STATUS_PENDING.to_string(),
        message: Some("Generation started".to_string()),
        started_at: Utc::now().naive_utc(),
    };
    diesel::insert_into(invoice_generation_logs::table)
        .values(&log)
        .execute(conn)?;
    Ok(log.id)
}

fn resolve_log(
    conn: &mut PgConnection,
    log_id: Uuid,
    status: &str,
    message: &str,
    duration_ms: i64,
) -> AppResult<()> {
    diesel::update(invoice_generation_logs::table.find(log_id))
        .set((
            invoice_generation_logs::status.eq(status),
            invoice_generation_logs::message.eq(message),
            invoice_generation_logs::finished_at.eq(Utc::now().naive_utc()),
            invoice_generation_logs::duration_ms.eq(duration_ms),
        ))
        .execute(conn)?;
    Ok(())
}

fn update_pdf_path(conn: &mut PgConnection, invoice_id: Uuid, pdf_path: &str) -> AppResult<()> {
    diesel::update(invoices::table.find(invoice_id))
        .set((
            invoices::pdf_path.eq(pdf_path),
            invoices::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    // Re-read the pointer so a lost update surfaces in the logs instead of
    // silently serving a stale document.
    let stored: Option<String> = invoices::table
        .find(invoice_id)
        .select(invoices::pdf_path)
        .first(conn)?;
    if stored.as_deref() != Some(pdf_path) {
        warn!(
            invoice_id = %invoice_id,
            expected = %pdf_path,
            stored = ?stored,
            "invoice pdf_path changed during generation"
        );
    }
    Ok(())
}

/// Fires the failure webhook when the three most recent attempts for this
/// invoice all failed. Alerting problems are logged and swallowed so the
/// caller still sees the original render error.
async fn maybe_alert_on_repeated_failures(
    state: &AppState,
    statement: &BillingStatement,
    error_message: &str,
) {
    let invoice = &statement.invoice;

    let recent: Vec<GenerationLog> = match state.db().and_then(|mut conn| {
        invoice_generation_logs::table
            .filter(invoice_generation_logs::invoice_id.eq(invoice.id))
            .order(invoice_generation_logs::started_at.desc())
            .limit(ALERT_FAILURE_WINDOW)
            .load(&mut conn)
            .map_err(AppError::from)
    }) {
        Ok(rows) => rows,
        Err(err) => {
            error!(
                invoice_id = %invoice.id,
                error = %err,
                "failed to load recent generation logs for alerting"
            );
            return;
        }
    };

    if recent.len() < ALERT_FAILURE_WINDOW as usize {
        return;
    }
    if !recent.iter().all(|row| row.status == LOG_STATUS_FAILED) {
        return;
    }

    state
        .alerts
        .invoice_failure(InvoiceFailureAlert {
            invoice_id: invoice.id,
            invoice_ref: Some(invoice.invoice_ref.clone()),
            error_message: error_message.to_string(),
            failure_count: recent.len(),
        })
        .await;
}
