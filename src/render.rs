//! Headless browser rendering for client-rendered pages.
//!
//! [`ChromeRenderer`] launches Chromium through the DevTools protocol,
//! navigates, waits for the load event plus a short quiet period, and returns
//! the serialized DOM. Renders are serialized through one async lock so at
//! most one browser runs per process. Browser launch and navigation together
//! are bounded by the navigation deadline.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RenderConfig;

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Return the fully rendered HTML of `url`.
    async fn render(&self, url: &str) -> Result<String>;
}

pub struct ChromeRenderer {
    user_agent: String,
    navigation_timeout: Duration,
    settle: Duration,
    executable: Option<PathBuf>,
    lock: Mutex<()>,
}

impl ChromeRenderer {
    pub fn new(config: &RenderConfig, user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            settle: Duration::from_millis(config.settle_ms),
            executable: config.chrome_executable.clone(),
            lock: Mutex::new(()),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--user-agent={}", self.user_agent));

        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| anyhow!("Browser config error: {e}"))
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let _guard = self.lock.lock().await;

        let deadline = Instant::now() + self.navigation_timeout;

        let (mut browser, mut handler) = before_deadline(deadline, "browser launch", async {
            Browser::launch(self.browser_config()?)
                .await
                .map_err(|e| anyhow!("Browser launch failed: {e}"))
        })
        .await?;
        let events = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let navigation = async {
            let page = browser
                .new_page(url)
                .await
                .map_err(|e| anyhow!("Failed to open page: {e}"))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| anyhow!("Navigation failed: {e}"))?;
            tokio::time::sleep(self.settle).await;
            let html = page
                .content()
                .await
                .map_err(|e| anyhow!("Failed to get content: {e}"))?;
            if let Err(e) = page.close().await {
                debug!(url, error = %e, "page close error");
            }
            Ok::<_, anyhow::Error>(html)
        };

        let result = before_deadline(deadline, "navigation", navigation).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close error");
        }
        let _ = browser.wait().await;
        events.abort();

        result
    }
}

/// Run `step` unless `deadline` passes first. Launch and navigation share
/// one deadline so the whole render stays within the navigation timeout.
async fn before_deadline<T, F>(deadline: Instant, step: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("Render timed out during {step}")),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    async fn slow_step(ms: u64) -> Result<&'static str> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok("done")
    }

    #[tokio::test]
    async fn steps_share_one_deadline() {
        let deadline = Instant::now() + Duration::from_millis(300);

        let first = before_deadline(deadline, "browser launch", slow_step(200)).await;
        assert_eq!(first.unwrap(), "done");

        // Fits on its own, but not in what the first step left over.
        let second = before_deadline(deadline, "navigation", slow_step(200)).await;
        let err = second.unwrap_err().to_string();
        assert!(err.contains("timed out during navigation"), "{}", err);
    }

    #[tokio::test]
    async fn step_errors_pass_through() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let result: Result<()> =
            before_deadline(deadline, "browser launch", async { Err(anyhow!("no chromium")) }).await;
        assert_eq!(result.unwrap_err().to_string(), "no chromium");
    }
}
