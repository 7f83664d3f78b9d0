use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use freightdesk::alerts::{AlertSink, InvoiceFailureAlert};
use freightdesk::config::AppConfig;
use freightdesk::db::{self, PgPool};
use freightdesk::models::{
    GenerationLog, NewCustomer, NewInvoice, NewInvoiceItem, NewRate, NewShipment,
};
use freightdesk::renderer::PdfEngine;
use freightdesk::routes;
use freightdesk::state::AppState;
use freightdesk::storage::ObjectStorage;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const FAKE_PDF_BYTES: &[u8] = b"%PDF-1.7 fake invoice pdf";

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let stored = StoredObject {
            key: key.to_string(),
            bytes,
            content_type: content_type.to_string(),
        };
        let mut guard = self.objects.lock().await;
        guard.insert(stored.key.clone(), stored);
        Ok(())
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let guard = self.objects.lock().await;
        ensure!(guard.contains_key(key), "object {key} missing");
        Ok(format!(
            "https://fake-storage/{key}?expires_in={}",
            expires_in.as_secs()
        ))
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let guard = self.objects.lock().await;
        guard
            .get(key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| anyhow!("object {key} missing"))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        let mut guard = self.objects.lock().await;
        guard.remove(key);
        Ok(())
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }

    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }
}

/// PDF engine stand-in. Fails the first `fail_next` renders, then returns
/// fixed bytes; the last rendered HTML is kept for assertions.
#[derive(Default)]
pub struct ScriptedRenderer {
    fail_next: AtomicUsize,
    last_html: Mutex<Option<String>>,
}

impl ScriptedRenderer {
    #[allow(dead_code)]
    pub fn fail_next_renders(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub async fn last_html(&self) -> Option<String> {
        self.last_html.lock().await.clone()
    }
}

#[async_trait]
impl PdfEngine for ScriptedRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>> {
        {
            let mut guard = self.last_html.lock().await;
            *guard = Some(html.to_string());
        }

        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            bail!("scripted render failure");
        }
        Ok(FAKE_PDF_BYTES.to_vec())
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<InvoiceFailureAlert>>,
}

impl RecordingAlerts {
    #[allow(dead_code)]
    pub async fn recorded(&self) -> Vec<InvoiceFailureAlert> {
        self.alerts.lock().await.clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn invoice_failure(&self, alert: InvoiceFailureAlert) {
        let mut guard = self.alerts.lock().await;
        guard.push(alert);
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    storage: Arc<FakeStorage>,
    renderer: Arc<ScriptedRenderer>,
    alerts: Arc<RecordingAlerts>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origin: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: "test-bucket".to_string(),
            signed_url_ttl_seconds: 3600,
            webdriver_url: "http://127.0.0.1:4444".to_string(),
            render_debug_dir: None,
            alert_webhook_url: None,
            upi_vpa: "necargo@upi".to_string(),
            upi_payee_name: "NORTHEAST CARGO EXPRESS".to_string(),
        };

        let pool = db::connect(&config)?;
        prepare_database(&pool).await?;

        let storage = Arc::new(FakeStorage::default());
        let renderer = Arc::new(ScriptedRenderer::default());
        let alerts = Arc::new(RecordingAlerts::default());

        let state = AppState::new(
            pool.clone(),
            config,
            storage.clone(),
            renderer.clone(),
            alerts.clone(),
        );
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            storage,
            renderer,
            alerts,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    #[allow(dead_code)]
    pub fn renderer(&self) -> Arc<ScriptedRenderer> {
        self.renderer.clone()
    }

    #[allow(dead_code)]
    pub fn alerts(&self) -> Arc<RecordingAlerts> {
        self.alerts.clone()
    }

    pub async fn insert_customer(&self, name: &str, city: &str, phone: &str) -> Result<Uuid> {
        let customer = NewCustomer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            email: None,
            city: Some(city.to_string()),
        };
        let id = customer.id;
        self.with_conn(move |conn| {
            diesel::insert_into(freightdesk::schema::customers::table)
                .values(&customer)
                .execute(conn)
                .context("failed to insert customer")?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    #[allow(dead_code)]
    pub async fn insert_shipment(
        &self,
        customer_id: Option<Uuid>,
        shipment_ref: &str,
        origin: &str,
        destination: &str,
        service_type: &str,
        weight: &str,
    ) -> Result<Uuid> {
        let shipment = NewShipment {
            id: Uuid::new_v4(),
            shipment_ref: shipment_ref.to_string(),
            customer_id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            service_type: service_type.to_string(),
            weight: parse_decimal(weight)?,
        };
        let id = shipment.id;
        self.with_conn(move |conn| {
            diesel::insert_into(freightdesk::schema::shipments::table)
                .values(&shipment)
                .execute(conn)
                .context("failed to insert shipment")?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    pub async fn insert_invoice(
        &self,
        customer_id: Uuid,
        invoice_ref: &str,
        amount: &str,
        status: &str,
        invoice_date: Option<NaiveDate>,
    ) -> Result<Uuid> {
        let invoice = NewInvoice {
            id: Uuid::new_v4(),
            invoice_ref: invoice_ref.to_string(),
            customer_id,
            amount: parse_decimal(amount)?,
            status: status.to_string(),
            invoice_date,
            due_date: None,
        };
        let id = invoice.id;
        self.with_conn(move |conn| {
            diesel::insert_into(freightdesk::schema::invoices::table)
                .values(&invoice)
                .execute(conn)
                .context("failed to insert invoice")?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    #[allow(dead_code)]
    pub async fn insert_invoice_item(
        &self,
        invoice_id: Uuid,
        shipment_id: Option<Uuid>,
        amount: &str,
    ) -> Result<Uuid> {
        let item = NewInvoiceItem {
            id: Uuid::new_v4(),
            invoice_id,
            shipment_id,
            amount: parse_decimal(amount)?,
        };
        let id = item.id;
        self.with_conn(move |conn| {
            diesel::insert_into(freightdesk::schema::invoice_items::table)
                .values(&item)
                .execute(conn)
                .context("failed to insert invoice item")?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    #[allow(dead_code)]
    pub async fn insert_rate(
        &self,
        origin: &str,
        destination: &str,
        service_type: &str,
        rate_per_kg: &str,
        base_fee: &str,
        min_weight: &str,
    ) -> Result<Uuid> {
        let rate = NewRate {
            id: Uuid::new_v4(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            service_type: service_type.to_string(),
            rate_per_kg: parse_decimal(rate_per_kg)?,
            base_fee: parse_decimal(base_fee)?,
            min_weight: parse_decimal(min_weight)?,
        };
        let id = rate.id;
        self.with_conn(move |conn| {
            diesel::insert_into(freightdesk::schema::rates::table)
                .values(&rate)
                .execute(conn)
                .context("failed to insert rate")?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    #[allow(dead_code)]
    pub async fn invoice_pdf_path(&self, invoice_id: Uuid) -> Result<Option<String>> {
        self.with_conn(move |conn| {
            use freightdesk::schema::invoices::dsl::{id, invoices, pdf_path};
            invoices
                .filter(id.eq(invoice_id))
                .select(pdf_path)
                .first(conn)
                .context("failed to load invoice pdf_path")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn invoice_amount(&self, invoice_id: Uuid) -> Result<BigDecimal> {
        self.with_conn(move |conn| {
            use freightdesk::schema::invoices::dsl::{amount, id, invoices};
            invoices
                .filter(id.eq(invoice_id))
                .select(amount)
                .first(conn)
                .context("failed to load invoice amount")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn generation_logs(&self, invoice_id: Uuid) -> Result<Vec<GenerationLog>> {
        self.with_conn(move |conn| {
            use freightdesk::schema::invoice_generation_logs::dsl::{
                invoice_generation_logs, invoice_id as invoice_id_col, started_at,
            };
            invoice_generation_logs
                .filter(invoice_id_col.eq(invoice_id))
                .order(started_at.asc())
                .load(conn)
                .context("failed to load generation logs")
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_empty(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(path)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

fn parse_decimal(raw: &str) -> Result<BigDecimal> {
    raw.parse()
        .map_err(|err| anyhow!("invalid decimal {raw}: {err}"))
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE invoice_generation_logs, invoice_items, invoices, shipments, rates, customers CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
