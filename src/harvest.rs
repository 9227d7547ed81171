//! Structured record harvesting.
//!
//! [`RecordHarvester`] turns source pages into stored records:
//!
//! - [`fetch_and_store`](RecordHarvester::fetch_and_store): one page, static
//!   fetch only, JSON-LD parse, insert-or-ignore. Any failure is `false`.
//! - [`live_search`](RecordHarvester::live_search): query the source's search
//!   page, keep links shaped like recipe pages, harvest each one in turn with
//!   a polite delay, and return the stored records for exactly those URLs.
//! - [`seed_urls`](RecordHarvester::seed_urls) /
//!   [`seed_terms`](RecordHarvester::seed_terms): the same per-item contract
//!   in bulk, with the longer seeding delay.
//!
//! Requests are strictly sequential. Only local-store failures surface as
//! `Err`; fetch and parse failures are logged and skipped.

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{Config, SearchConfig};
use crate::http::{Fetcher, HttpFetcher};
use crate::models::Record;
use crate::progress::{SeedKind, SeedProgressEvent, SeedProgressReporter};
use crate::schema;
use crate::store::LocalStore;

pub struct RecordHarvester {
    fetcher: Arc<dyn Fetcher>,
    store: LocalStore,
    endpoint: String,
    patterns: Vec<Regex>,
    max_results: usize,
    request_delay: Duration,
    seed_delay: Duration,
}

impl RecordHarvester {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: LocalStore, config: &SearchConfig) -> Result<Self> {
        let patterns = config
            .link_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid link pattern: {}", p)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            fetcher,
            store,
            endpoint: config.endpoint.clone(),
            patterns,
            max_results: config.max_results,
            request_delay: Duration::from_millis(config.request_delay_ms),
            seed_delay: Duration::from_millis(config.seed_delay_ms),
        })
    }

    pub fn from_config(config: &Config, store: LocalStore) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(
            &config.http.user_agent,
            config.http.timeout(),
        )?);
        Self::new(fetcher, store, &config.search)
    }

    /// Override the inter-request delays (live search, seeding).
    pub fn with_delays(mut self, request: Duration, seed: Duration) -> Self {
        self.request_delay = request;
        self.seed_delay = seed;
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Fetch `url`, parse its recipe schema, and insert it. `true` only if a
    /// new row was written.
    pub async fn fetch_and_store(&self, url: &str) -> bool {
        match self.try_fetch_and_store(url).await {
            Ok(inserted) => {
                debug!(url = %url, inserted, "harvested");
                inserted
            }
            Err(e) => {
                warn!(url = %url, error = %e, "harvest failed, skipping");
                false
            }
        }
    }

    async fn try_fetch_and_store(&self, url: &str) -> Result<bool> {
        let html = self.fetcher.get_text(url).await?;
        let record = schema::parse_recipe(&html, url)?;
        self.store.insert_if_absent(&record).await
    }

    /// Search the source for `query`, harvest up to `max_results` result
    /// pages, and return the stored records for those pages ordered by
    /// title.
    pub async fn live_search(&self, query: &str, max_results: usize) -> Result<Vec<Record>> {
        let search_url = search_url(&self.endpoint, query);

        let html = match self.fetcher.get_text(&search_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(query = %query, error = %e, "search page fetch failed");
                return Ok(Vec::new());
            }
        };

        let candidates = candidate_links(&html, &search_url, &self.patterns, max_results);
        if candidates.is_empty() {
            info!(query = %query, "no candidate pages on search results");
            return Ok(Vec::new());
        }

        info!(query = %query, candidates = candidates.len(), "harvesting search results");
        for (i, url) in candidates.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.request_delay).await;
            }
            self.fetch_and_store(url).await;
        }

        self.store.records_by_urls(&candidates).await
    }

    /// Harvest every URL in `urls`. Returns the number of new records.
    pub async fn seed_urls(&self, urls: &[String], progress: &dyn SeedProgressReporter) -> usize {
        let total = urls.len() as u64;
        let mut added = 0usize;

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.seed_delay).await;
            }
            let inserted = self.fetch_and_store(url).await;
            if inserted {
                added += 1;
            }
            progress.report(SeedProgressEvent::Item {
                kind: SeedKind::Urls,
                n: i as u64 + 1,
                total,
                item: url.clone(),
                added: u64::from(inserted),
            });
        }

        progress.report(SeedProgressEvent::Finished {
            kind: SeedKind::Urls,
            added: added as u64,
        });
        added
    }

    /// Run a live search for each term. Returns how many records the store
    /// gained. A failing term is logged and skipped.
    pub async fn seed_terms(
        &self,
        terms: &[String],
        max_results: usize,
        progress: &dyn SeedProgressReporter,
    ) -> Result<i64> {
        let before = self.store.count().await?;
        let total = terms.len() as u64;
        let mut last = before;

        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.seed_delay).await;
            }
            match self.live_search(term, max_results).await {
                Ok(records) => debug!(term = %term, found = records.len(), "term seeded"),
                Err(e) => warn!(term = %term, error = %e, "term failed, skipping"),
            }

            let now = self.store.count().await?;
            progress.report(SeedProgressEvent::Item {
                kind: SeedKind::Terms,
                n: i as u64 + 1,
                total,
                item: term.clone(),
                added: (now - last).max(0) as u64,
            });
            last = now;
        }

        let added = last - before;
        progress.report(SeedProgressEvent::Finished {
            kind: SeedKind::Terms,
            added: added.max(0) as u64,
        });
        Ok(added)
    }
}

/// `endpoint` with `{query}` replaced by the URL-encoded query.
pub fn search_url(endpoint: &str, query: &str) -> String {
    endpoint.replace("{query}", &urlencoding::encode(query.trim()))
}

/// Links in `html` that match one of `patterns`, resolved against
/// `base_url`, deduplicated, in page order, at most `max`.
pub fn candidate_links(html: &str, base_url: &str, patterns: &[Regex], max: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let base = Url::parse(base_url).ok();
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&selector) {
        if links.len() >= max {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let resolved = match &base {
            Some(base) => match base.join(href.trim()) {
                Ok(u) => u.to_string(),
                Err(_) => continue,
            },
            None => href.trim().to_string(),
        };
        if !patterns.iter().any(|p| p.is_match(&resolved)) {
            continue;
        }
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}

/// One entry per non-blank line; `#` starts a comment line.
pub fn read_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
