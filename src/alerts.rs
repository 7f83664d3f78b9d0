//! Outbound failure alerts.
//!
//! Alert delivery is strictly best-effort: a broken webhook must never turn a
//! PDF generation failure into a different failure, so every error path here
//! ends in a log line and nothing else.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InvoiceFailureAlert {
    pub invoice_id: Uuid,
    pub invoice_ref: Option<String>,
    pub error_message: String,
    pub failure_count: usize,
}

impl InvoiceFailureAlert {
    fn text(&self) -> String {
        let mut lines = vec![
            "Invoice PDF generation has repeatedly failed.".to_string(),
            format!("Invoice ID: {}", self.invoice_id),
        ];
        if let Some(invoice_ref) = &self.invoice_ref {
            lines.push(format!("Invoice Ref: {invoice_ref}"));
        }
        lines.push(format!(
            "Failure count (recent attempts): {}",
            self.failure_count
        ));
        lines.push(format!("Last error: {}", self.error_message));
        lines.join("\n")
    }
}

#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    async fn invoice_failure(&self, alert: InvoiceFailureAlert);
}

pub struct WebhookAlerts {
    url: Option<String>,
    http: Client,
}

impl WebhookAlerts {
    pub fn new(url: Option<String>) -> Self {
        Self {
            url,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlerts {
    async fn invoice_failure(&self, alert: InvoiceFailureAlert) {
        let Some(url) = &self.url else {
            warn!(
                invoice_id = %alert.invoice_id,
                "alert webhook not configured, skipping failure alert"
            );
            return;
        };

        let payload = serde_json::json!({ "text": alert.text() });
        match self.http.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!(invoice_id = %alert.invoice_id, "sent invoice failure alert");
            }
            Ok(response) => {
                error!(
                    invoice_id = %alert.invoice_id,
                    status = %response.status(),
                    "alert webhook rejected failure alert"
                );
            }
            Err(err) => {
                error!(
                    invoice_id = %alert.invoice_id,
                    error = %err,
                    "failed to deliver invoice failure alert"
                );
            }
        }
    }
}
