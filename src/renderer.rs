//! Headless-browser PDF rendering.
//!
//! A single WebDriver session is shared across all renders and lazily
//! re-established when the browser dies. Each render runs in its own window
//! so a failed print cannot leave stale page state behind for the next one.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use fantoccini::wd::{PrintConfigurationBuilder, PrintMargins, PrintSize};
use fantoccini::{Client, ClientBuilder};
use serde_json::Map;
use tokio::sync::Mutex;
use tracing::warn;

#[async_trait]
pub trait PdfEngine: Send + Sync + 'static {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>>;
}

pub struct BrowserRenderer {
    webdriver_url: String,
    session: Mutex<Option<Client>>,
    debug_dir: Option<PathBuf>,
}

impl BrowserRenderer {
    pub fn new(webdriver_url: impl Into<String>, debug_dir: Option<PathBuf>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            session: Mutex::new(None),
            debug_dir,
        }
    }

    async fn connect(&self) -> Result<Client> {
        let mut caps = Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-setuid-sandbox",
                    "--disable-dev-shm-usage",
                ]
            }),
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .with_context(|| format!("failed to connect to webdriver at {}", self.webdriver_url))?;
        Ok(client)
    }

    /// Health-checks the cached session and reconnects when the browser went
    /// away. The caller holds the session lock.
    async fn ensure_session<'a>(&self, slot: &'a mut Option<Client>) -> Result<&'a Client> {
        if let Some(client) = slot.as_ref() {
            if let Err(err) = client.windows().await {
                warn!(error = %err, "webdriver session lost, reconnecting");
                *slot = None;
            }
        }

        if slot.is_none() {
            *slot = Some(self.connect().await?);
        }

        match slot.as_ref() {
            Some(client) => Ok(client),
            None => Err(anyhow!("webdriver session unavailable")),
        }
    }

    async fn save_debug_snapshot(&self, client: &Client) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let result: Result<()> = async {
            let png = client.screenshot().await?;
            tokio::fs::create_dir_all(dir).await?;
            let name = format!("invoice-{}.png", chrono::Utc::now().timestamp_millis());
            tokio::fs::write(dir.join(name), png).await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            warn!(error = %err, "failed to write render debug snapshot");
        }
    }
}

#[async_trait]
impl PdfEngine for BrowserRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Vec<u8>> {
        // Window focus is session-global, so the lock is held for the whole
        // render: concurrent requests queue rather than steal each other's
        // window.
        let mut slot = self.session.lock().await;
        let client = self.ensure_session(&mut slot).await?;

        let base_window = client
            .window()
            .await
            .context("failed to resolve base browser window")?;
        let new_window = client
            .new_window(true)
            .await
            .context("failed to open render window")?;
        client
            .switch_to_window(new_window.handle)
            .await
            .context("failed to switch to render window")?;

        let rendered = self.print_current_window(client, html).await;

        // Always tear the render window down, even when printing failed.
        if let Err(err) = client.close_window().await {
            warn!(error = %err, "failed to close render window");
        }
        if let Err(err) = client.switch_to_window(base_window).await {
            warn!(error = %err, "failed to switch back to base window");
        }

        rendered
    }
}

impl BrowserRenderer {
    async fn print_current_window(&self, client: &Client, html: &str) -> Result<Vec<u8>> {
        let data_url = format!("data:text/html;base64,{}", BASE64.encode(html.as_bytes()));
        client
            .goto(&data_url)
            .await
            .context("failed to load invoice document in browser")?;

        self.save_debug_snapshot(client).await;

        let print_config = PrintConfigurationBuilder::default()
            .background(true)
            .scale(0.9)
            .margins(PrintMargins {
                top: 0.0,
                left: 0.0,
                right: 0.0,
                bottom: 0.0,
            })
            // A4 in centimeters.
            .size(PrintSize {
                width: 21.0,
                height: 29.7,
            })
            .build()
            .map_err(|e| anyhow!("invalid print configuration: {e:?}"))?;

        let pdf = client
            .print(print_config)
            .await
            .context("failed to print invoice to PDF")?;

        if pdf.is_empty() {
            return Err(anyhow!("browser produced an empty PDF"));
        }
        Ok(pdf)
    }
}
