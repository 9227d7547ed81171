//! Visible-text extraction with static → rendered escalation.
//!
//! ```text
//!   GET (static) ──▶ clean ──▶ should_escalate? ──no──▶ static text
//!                                   │ yes
//!                                   ▼
//!                           render (headless) ──▶ clean
//!                                   │
//!                                   ▼
//!                     longer of (static, rendered)
//! ```
//!
//! A failed static fetch counts as empty text and still escalates. A failed
//! render counts as empty text, so the static result survives. Nothing here
//! returns an error; total failure is an empty string.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clean::clean_html;
use crate::config::Config;
use crate::http::{Fetcher, HttpFetcher};
use crate::models::{ExtractedText, TextOrigin};
use crate::render::{ChromeRenderer, Renderer};

/// Static text shorter than this (in characters, after trimming) is presumed
/// to come from a client-rendered page.
pub const ESCALATION_THRESHOLD: usize = 200;

/// Decides whether cleaned static text is too thin to trust.
pub type EscalationPolicy = fn(&str) -> bool;

/// Default [`EscalationPolicy`]: fewer than [`ESCALATION_THRESHOLD`] characters.
pub fn should_escalate(text: &str) -> bool {
    text.trim().chars().count() < ESCALATION_THRESHOLD
}

pub struct ContentExtractor {
    fetcher: Arc<dyn Fetcher>,
    renderer: Option<Arc<dyn Renderer>>,
    policy: EscalationPolicy,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>, renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self {
            fetcher,
            renderer,
            policy: should_escalate,
        }
    }

    /// Production instance: reqwest static path, Chromium rendered path
    /// unless `[render] enabled = false`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(
            &config.http.user_agent,
            config.http.timeout(),
        )?);
        let renderer: Option<Arc<dyn Renderer>> = if config.render.enabled {
            Some(Arc::new(ChromeRenderer::new(
                &config.render,
                &config.http.user_agent,
            )))
        } else {
            None
        };
        Ok(Self::new(fetcher, renderer))
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cleaned visible text of `url`, escalating to a rendered fetch when the
    /// static text is too short. Empty on total failure.
    pub async fn extract_text(&self, url: &str) -> ExtractedText {
        let static_text = match self.fetcher.get_text(url).await {
            Ok(html) => clean_html(&html),
            Err(e) => {
                warn!(url = %url, error = %e, "static fetch failed");
                String::new()
            }
        };

        let static_result = ExtractedText {
            text: static_text,
            origin: TextOrigin::Static,
        };

        if !(self.policy)(&static_result.text) {
            return static_result;
        }

        let Some(renderer) = &self.renderer else {
            debug!(url = %url, "static text is thin but rendering is disabled");
            return static_result;
        };

        info!(
            url = %url,
            chars = static_result.text.trim().chars().count(),
            "static text too short, rendering in headless browser"
        );

        let rendered_text = match renderer.render(url).await {
            Ok(html) => clean_html(&html),
            Err(e) => {
                warn!(url = %url, error = %e, "rendered fetch failed, keeping static text");
                String::new()
            }
        };

        let rendered_result = ExtractedText {
            text: rendered_text,
            origin: TextOrigin::Rendered,
        };

        if rendered_result.char_len() > static_result.char_len() {
            rendered_result
        } else {
            static_result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubFetcher;
    use crate::render::testing::StubRenderer;

    const URL: &str = "https://noodles.example/";

    fn page_with_text(chars: usize) -> String {
        format!("<html><body><p>{}</p></body></html>", "m".repeat(chars))
    }

    #[test]
    fn threshold_boundary() {
        assert!(should_escalate(""));
        assert!(should_escalate(&"x".repeat(199)));
        assert!(!should_escalate(&"x".repeat(200)));
        assert!(should_escalate(&format!("   {}   ", "x".repeat(150))));
    }

    #[tokio::test]
    async fn long_static_text_skips_rendering() {
        let fetcher = Arc::new(StubFetcher::new().ok(URL, &page_with_text(400)));
        let renderer = Arc::new(StubRenderer::ok(&page_with_text(5000)));
        let extractor = ContentExtractor::new(fetcher, Some(renderer.clone()));

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Static);
        assert_eq!(result.char_len(), 400);
        assert_eq!(renderer.calls(), 0);
    }

    #[tokio::test]
    async fn short_static_text_escalates_and_rendered_wins() {
        let fetcher = Arc::new(StubFetcher::new().ok(URL, &page_with_text(150)));
        let renderer = Arc::new(StubRenderer::ok(&page_with_text(500)));
        let extractor = ContentExtractor::new(fetcher, Some(renderer.clone()));

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Rendered);
        assert_eq!(result.char_len(), 500);
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn failed_render_keeps_static_text() {
        let fetcher = Arc::new(StubFetcher::new().ok(URL, &page_with_text(150)));
        let renderer = Arc::new(StubRenderer::fail("chromium not installed"));
        let extractor = ContentExtractor::new(fetcher, Some(renderer.clone()));

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Static);
        assert_eq!(result.char_len(), 150);
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn failed_static_fetch_still_escalates() {
        let fetcher = Arc::new(StubFetcher::new().fail(URL, "HTTP 403 Forbidden"));
        let renderer = Arc::new(StubRenderer::ok(&page_with_text(300)));
        let extractor = ContentExtractor::new(fetcher, Some(renderer));

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Rendered);
        assert_eq!(result.char_len(), 300);
    }

    #[tokio::test]
    async fn total_failure_is_empty_text() {
        let fetcher = Arc::new(StubFetcher::new().fail(URL, "timeout"));
        let renderer = Arc::new(StubRenderer::fail("timeout"));
        let extractor = ContentExtractor::new(fetcher, Some(renderer));

        let result = extractor.extract_text(URL).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn rendered_shorter_than_static_loses() {
        let fetcher = Arc::new(StubFetcher::new().ok(URL, &page_with_text(120)));
        let renderer = Arc::new(StubRenderer::ok(&page_with_text(80)));
        let extractor = ContentExtractor::new(fetcher, Some(renderer));

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Static);
        assert_eq!(result.char_len(), 120);
    }

    #[tokio::test]
    async fn policy_is_swappable() {
        let fetcher = Arc::new(StubFetcher::new().ok(URL, &page_with_text(400)));
        let renderer = Arc::new(StubRenderer::ok(&page_with_text(900)));
        let extractor =
            ContentExtractor::new(fetcher, Some(renderer.clone())).with_policy(|_| true);

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Rendered);
        assert_eq!(renderer.calls(), 1);
    }

    #[tokio::test]
    async fn no_renderer_returns_static_text() {
        let fetcher = Arc::new(StubFetcher::new().ok(URL, &page_with_text(50)));
        let extractor = ContentExtractor::new(fetcher, None);

        let result = extractor.extract_text(URL).await;
        assert_eq!(result.origin, TextOrigin::Static);
        assert_eq!(result.char_len(), 50);
    }
}
