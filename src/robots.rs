//! robots.txt gate.
//!
//! Fail-open: if the policy file cannot be fetched (timeout, 404, 403, DNS
//! failure) or the target URL has no host, the fetch is allowed. Only an
//! explicit matching `Disallow` rule denies.

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::http::Fetcher;

/// `<scheme>://<host>[:port]/robots.txt` for `url`, or `None` if `url` has
/// no host.
pub fn robots_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}/robots.txt", parsed.scheme(), host, port),
        None => format!("{}://{}/robots.txt", parsed.scheme(), host),
    })
}

/// Evaluate a robots.txt body for `user_agent` fetching `url`.
pub fn evaluate(robots_body: &str, url: &str, user_agent: &str) -> bool {
    let mut matcher = robotstxt::DefaultMatcher::default();
    matcher.one_agent_allowed_by_robots(robots_body, user_agent, url)
}

pub struct RobotsGate {
    fetcher: Arc<dyn Fetcher>,
}

impl RobotsGate {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let Some(policy_url) = robots_url(url) else {
            debug!(url = %url, "no host in url, allowing");
            return true;
        };

        match self.fetcher.get_text(&policy_url).await {
            Ok(body) => {
                let allowed = evaluate(&body, url, user_agent);
                debug!(url = %url, agent = %user_agent, allowed, "robots.txt evaluated");
                allowed
            }
            Err(e) => {
                debug!(robots = %policy_url, error = %e, "robots.txt unavailable, allowing");
                true
            }
        }
    }
}
