//! The menu data flow: area → places → policy check → page text.
//!
//! Places without a website are dropped. Places whose site disallows the
//! configured agent are kept in the output (so callers can say why) but
//! never fetched. Text is handed on as-is; summarizing it is someone else's
//! job.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::extract::ContentExtractor;
use crate::geo::GeoDiscovery;
use crate::http::HttpFetcher;
use crate::models::{ExtractedText, PointOfInterest};
use crate::robots::RobotsGate;

#[derive(Debug, Clone, Serialize)]
pub struct ScoutedPlace {
    pub poi: PointOfInterest,
    /// robots.txt verdict for the place's website.
    pub allowed: bool,
    /// `None` when not allowed.
    pub text: Option<ExtractedText>,
}

pub struct Scout {
    geo: GeoDiscovery,
    robots: RobotsGate,
    extractor: ContentExtractor,
    agent: String,
}

impl Scout {
    pub fn new(
        geo: GeoDiscovery,
        robots: RobotsGate,
        extractor: ContentExtractor,
        agent: &str,
    ) -> Self {
        Self {
            geo,
            robots,
            extractor,
            agent: agent.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let geo = GeoDiscovery::from_config(&config.geo, &config.http.user_agent)?;
        let robots = RobotsGate::new(Arc::new(HttpFetcher::new(
            &config.http.user_agent,
            config.http.timeout(),
        )?));
        let extractor = ContentExtractor::from_config(config)?;
        Ok(Self::new(geo, robots, extractor, &config.http.robots_agent))
    }

    /// Up to `limit` places in `area` that have a website, each with its
    /// policy verdict and, when allowed, its page text.
    pub async fn scout(
        &self,
        area: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Vec<ScoutedPlace> {
        let pois = self.geo.find_pois(area, category).await;
        let with_site: Vec<PointOfInterest> = pois
            .into_iter()
            .filter(|poi| poi.website.as_deref().is_some_and(|w| !w.trim().is_empty()))
            .take(limit)
            .collect();

        info!(area = %area, places = with_site.len(), "scouting places with websites");

        let mut places = Vec::with_capacity(with_site.len());
        for poi in with_site {
            let Some(site) = poi.website.clone() else {
                continue;
            };
            let allowed = self.robots.is_allowed(&site, &self.agent).await;
            let text = if allowed {
                Some(self.extractor.extract_text(&site).await)
            } else {
                info!(url = %site, "robots.txt disallows, skipping");
                None
            };
            places.push(ScoutedPlace { poi, allowed, text });
        }
        places
    }
}
