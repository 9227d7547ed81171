//! Point-of-interest discovery over OpenStreetMap's Overpass API.
//!
//! Two steps:
//!
//! 1. [`resolve_area`] turns free text ("Kits", "mt pleasant") into a
//!    [`BoundingBox`] from a fixed table of Vancouver neighbourhoods. It never
//!    fails; unknown input resolves to the whole-city box.
//! 2. [`GeoDiscovery::find_pois`] sends an Overpass QL query for named
//!    amenities inside the box to each configured endpoint in order, retrying
//!    each one under a [`RetryPolicy`] before failing over to the next. When
//!    every endpoint is exhausted the result is an empty list, not an error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GeoConfig;
use crate::http::{Fetcher, HttpFetcher};
use crate::models::{BoundingBox, PointOfInterest};

/// Named areas, `(south, west, north, east)`.
pub const AREAS: &[(&str, BoundingBox)] = &[
    ("downtown", BoundingBox::new(49.2760, -123.1350, 49.2920, -123.1050)),
    ("gastown", BoundingBox::new(49.2820, -123.1120, 49.2870, -123.0970)),
    ("chinatown", BoundingBox::new(49.2770, -123.1060, 49.2820, -123.0950)),
    ("yaletown", BoundingBox::new(49.2700, -123.1250, 49.2780, -123.1100)),
    ("west end", BoundingBox::new(49.2800, -123.1450, 49.2920, -123.1250)),
    ("mount pleasant", BoundingBox::new(49.2530, -123.1150, 49.2700, -123.0850)),
    ("kitsilano", BoundingBox::new(49.2600, -123.1750, 49.2750, -123.1350)),
    ("commercial drive", BoundingBox::new(49.2560, -123.0740, 49.2750, -123.0630)),
    ("main street", BoundingBox::new(49.2430, -123.1050, 49.2650, -123.0900)),
    ("hastings-sunrise", BoundingBox::new(49.2750, -123.0550, 49.2850, -123.0150)),
    ("strathcona", BoundingBox::new(49.2700, -123.0900, 49.2780, -123.0720)),
    ("grandview-woodland", BoundingBox::new(49.2700, -123.0750, 49.2820, -123.0500)),
    ("fairview", BoundingBox::new(49.2600, -123.1400, 49.2720, -123.1150)),
    ("south granville", BoundingBox::new(49.2500, -123.1500, 49.2630, -123.1350)),
    ("kerrisdale", BoundingBox::new(49.2270, -123.1600, 49.2420, -123.1400)),
    ("dunbar", BoundingBox::new(49.2350, -123.1900, 49.2550, -123.1650)),
    ("point grey", BoundingBox::new(49.2600, -123.2100, 49.2750, -123.1850)),
    ("riley park", BoundingBox::new(49.2400, -123.1050, 49.2540, -123.0850)),
    ("cambie", BoundingBox::new(49.2370, -123.1250, 49.2530, -123.1050)),
    ("marpole", BoundingBox::new(49.2050, -123.1400, 49.2250, -123.1200)),
    ("coal harbour", BoundingBox::new(49.2870, -123.1300, 49.2950, -123.1100)),
    ("olympic village", BoundingBox::new(49.2660, -123.1120, 49.2730, -123.1000)),
    ("vancouver", WHOLE_REGION),
];

/// Fallback covering the whole metro region.
pub const WHOLE_REGION: BoundingBox = BoundingBox::new(49.2000, -123.2500, 49.3200, -123.0200);

/// Short forms and the fragment of a table key they stand for.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("mt", "mount"),
    ("comm", "commercial"),
    ("e van", "hastings"),
    ("kits", "kitsilano"),
];

/// Resolve free text to a bounding box: exact key, then substring either
/// way, then abbreviation expansion, then [`WHOLE_REGION`].
pub fn resolve_area(name: &str) -> BoundingBox {
    let key = name.trim().to_lowercase();

    if let Some((_, bbox)) = AREAS.iter().find(|(area, _)| *area == key) {
        return *bbox;
    }

    if !key.is_empty() {
        if let Some((_, bbox)) = AREAS
            .iter()
            .find(|(area, _)| area.contains(key.as_str()) || key.contains(area))
        {
            return *bbox;
        }
    }

    for (abbrev, full) in ABBREVIATIONS {
        if key.contains(abbrev) {
            if let Some((_, bbox)) = AREAS.iter().find(|(area, _)| area.contains(full)) {
                return *bbox;
            }
        }
    }

    info!(area = %name, "area not recognized, searching the whole region");
    WHOLE_REGION
}

/// Per-endpoint retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts_per_endpoint: u32,
    /// Sleep `backoff_base * attempt` after each failed attempt but the last.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GeoConfig) -> Self {
        Self {
            max_attempts_per_endpoint: config.max_attempts_per_endpoint.max(1),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

/// Build the Overpass QL query for named amenities of one kind in `bbox`,
/// requesting both nodes and ways.
pub fn build_query(
    bbox: &BoundingBox,
    amenity: &str,
    category: Option<&str>,
    timeout_secs: u64,
) -> String {
    let category_filter = match category.map(str::trim) {
        Some(c) if !c.is_empty() => format!("[\"cuisine\"~\"{}\",i]", escape_ql(c)),
        _ => String::new(),
    };
    let amenity = escape_ql(amenity);
    let bbox = bbox.to_overpass();

    format!(
        "[out:json][timeout:{timeout}];\n(\n  node[\"amenity\"=\"{amenity}\"]{filter}{bbox};\n  way[\"amenity\"=\"{amenity}\"]{filter}{bbox};\n);\nout body center;\n",
        timeout = timeout_secs,
        amenity = amenity,
        filter = category_filter,
        bbox = bbox,
    )
}

fn escape_ql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: i64,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Parse an Overpass JSON body into places. Elements without a `name` tag
/// are dropped.
pub fn parse_elements(body: &str, default_city: &str) -> Result<Vec<PointOfInterest>> {
    let response: OverpassResponse =
        serde_json::from_str(body).context("Invalid Overpass response")?;

    Ok(response
        .elements
        .into_iter()
        .filter_map(|element| to_poi(element, default_city))
        .collect())
}

fn to_poi(element: OverpassElement, default_city: &str) -> Option<PointOfInterest> {
    let tags = element.tags;
    let name = tags.get("name").filter(|n| !n.trim().is_empty())?.clone();

    let tag = |key: &str| tags.get(key).map(String::as_str).unwrap_or("");
    let city = tags
        .get("addr:city")
        .map(String::as_str)
        .unwrap_or(default_city);
    let address = format!("{} {}, {}", tag("addr:housenumber"), tag("addr:street"), city)
        .trim_matches(|c| c == ' ' || c == ',')
        .to_string();

    let website = ["website", "contact:website"]
        .iter()
        .filter_map(|key| tags.get(*key))
        .find(|w| !w.trim().is_empty())
        .cloned();

    Some(PointOfInterest {
        name,
        address,
        website,
        source_id: element.id,
    })
}

pub struct GeoDiscovery {
    fetcher: Arc<dyn Fetcher>,
    endpoints: Vec<String>,
    policy: RetryPolicy,
    amenity: String,
    default_city: String,
    query_timeout_secs: u64,
}

impl GeoDiscovery {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &GeoConfig) -> Self {
        Self {
            fetcher,
            endpoints: config.endpoints.clone(),
            policy: RetryPolicy::from_config(config),
            amenity: config.amenity.clone(),
            default_city: config.default_city.clone(),
            query_timeout_secs: config.query_timeout_secs,
        }
    }

    /// Production instance with its own long-deadline HTTP client.
    pub fn from_config(config: &GeoConfig, user_agent: &str) -> Result<Self> {
        let fetcher = HttpFetcher::new(
            user_agent,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn resolve_area(&self, name: &str) -> BoundingBox {
        resolve_area(name)
    }

    /// Named places in `area`, optionally filtered by cuisine tag. Returns an
    /// empty list when every endpoint fails.
    pub async fn find_pois(&self, area: &str, category: Option<&str>) -> Vec<PointOfInterest> {
        let bbox = resolve_area(area);
        let query = build_query(&bbox, &self.amenity, category, self.query_timeout_secs);

        match self.query_with_failover(&query).await {
            Some(pois) => {
                debug!(count = pois.len(), "parsed points of interest");
                pois
            }
            None => {
                warn!("all Overpass endpoints failed");
                Vec::new()
            }
        }
    }

    /// A response body that is not Overpass JSON (rate-limit or proxy error
    /// pages served with 200) counts as a failed attempt.
    async fn query_with_failover(&self, query: &str) -> Option<Vec<PointOfInterest>> {
        let max = self.policy.max_attempts_per_endpoint;

        for endpoint in &self.endpoints {
            for attempt in 1..=max {
                let result = match self.fetcher.post_form(endpoint, &[("data", query)]).await {
                    Ok(body) => parse_elements(&body, &self.default_city),
                    Err(e) => Err(e),
                };
                match result {
                    Ok(pois) => return Some(pois),
                    Err(e) => {
                        warn!(endpoint = %endpoint, attempt, max, error = %e, "Overpass request failed");
                        if attempt < max {
                            tokio::time::sleep(self.policy.backoff(attempt)).await;
                        }
                    }
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubFetcher;

    const PRIMARY: &str = "https://primary.test/api/interpreter";
    const MIRROR: &str = "https://mirror.test/api/interpreter";

    fn geo_config() -> GeoConfig {
        GeoConfig {
            endpoints: vec![PRIMARY.to_string(), MIRROR.to_string()],
            backoff_base_secs: 0,
            ..GeoConfig::default()
        }
    }

    fn bbox_of(key: &str) -> BoundingBox {
        AREAS.iter().find(|(k, _)| *k == key).unwrap().1
    }

    const OVERPASS_BODY: &str = r#"{
        "elements": [
            {"type": "node", "id": 101, "tags": {
                "name": "Ramen Danbo",
                "addr:housenumber": "1833",
                "addr:street": "W 4th Ave",
                "website": "https://danbo.example",
                "contact:website": "https://other.example"
            }},
            {"type": "node", "id": 102, "tags": {"amenity": "restaurant"}},
            {"type": "way", "id": 103, "tags": {
                "name": "Kinton",
                "addr:street": "Main St",
                "addr:city": "Burnaby",
                "contact:website": "https://kinton.example"
            }},
            {"type": "node", "id": 104}
        ]
    }"#;

    #[test]
    fn every_area_box_is_well_formed() {
        for (name, bbox) in AREAS {
            assert!(bbox.is_valid(), "{} has an inverted box", name);
        }
    }

    #[test]
    fn exact_match_is_case_insensitive() {
        assert_eq!(resolve_area("Gastown"), bbox_of("gastown"));
        assert_eq!(resolve_area("  WEST END "), bbox_of("west end"));
    }

    #[test]
    fn substring_match_either_direction() {
        assert_eq!(resolve_area("kitsilano beach"), bbox_of("kitsilano"));
        assert_eq!(resolve_area("granville"), bbox_of("south granville"));
    }

    #[test]
    fn abbreviation_resolves_like_canonical_name() {
        assert_eq!(resolve_area("mt pleasant"), resolve_area("mount pleasant"));
        assert_eq!(resolve_area("Kits"), bbox_of("kitsilano"));
        assert_eq!(resolve_area("e van"), bbox_of("hastings-sunrise"));
    }

    #[test]
    fn unknown_area_falls_back_to_whole_region() {
        assert_eq!(resolve_area("Nonexistent Area"), WHOLE_REGION);
        assert_eq!(resolve_area(""), WHOLE_REGION);
    }

    #[test]
    fn query_includes_nodes_ways_and_optional_filter() {
        let bbox = bbox_of("gastown");
        let plain = build_query(&bbox, "restaurant", None, 25);
        assert!(plain.contains("[out:json][timeout:25];"));
        assert!(plain.contains("node[\"amenity\"=\"restaurant\"](49.282,-123.112,49.287,-123.097);"));
        assert!(plain.contains("way[\"amenity\"=\"restaurant\"]"));
        assert!(plain.contains("out body center;"));
        assert!(!plain.contains("cuisine"));

        let filtered = build_query(&bbox, "restaurant", Some("Ramen"), 25);
        assert!(filtered.contains("[\"cuisine\"~\"Ramen\",i]"));

        let blank = build_query(&bbox, "restaurant", Some("  "), 25);
        assert!(!blank.contains("cuisine"));
    }

    #[test]
    fn category_input_is_escaped() {
        let q = build_query(&WHOLE_REGION, "restaurant", Some("a\"]b"), 25);
        assert!(q.contains("[\"cuisine\"~\"a\\\"]b\",i]"));
    }

    #[test]
    fn parse_skips_unnamed_and_builds_addresses() {
        let pois = parse_elements(OVERPASS_BODY, "Vancouver").unwrap();
        assert_eq!(pois.len(), 2);

        assert_eq!(pois[0].name, "Ramen Danbo");
        assert_eq!(pois[0].address, "1833 W 4th Ave, Vancouver");
        assert_eq!(pois[0].website.as_deref(), Some("https://danbo.example"));
        assert_eq!(pois[0].source_id, 101);

        assert_eq!(pois[1].name, "Kinton");
        assert_eq!(pois[1].address, "Main St, Burnaby");
        assert_eq!(pois[1].website.as_deref(), Some("https://kinton.example"));
    }

    #[test]
    fn address_with_no_street_is_just_the_city() {
        let body = r#"{"elements":[{"id":1,"tags":{"name":"Cart"}}]}"#;
        let pois = parse_elements(body, "Vancouver").unwrap();
        assert_eq!(pois[0].address, "Vancouver");
        assert_eq!(pois[0].website, None);
    }

    #[tokio::test]
    async fn primary_success_needs_one_request() {
        let stub = Arc::new(StubFetcher::new().ok(PRIMARY, OVERPASS_BODY));
        let geo = GeoDiscovery::new(stub.clone(), &geo_config());

        let pois = geo.find_pois("gastown", None).await;
        assert_eq!(pois.len(), 2);
        assert_eq!(stub.calls(), vec![PRIMARY]);
    }

    #[tokio::test]
    async fn retries_then_fails_over_to_mirror() {
        let stub = Arc::new(
            StubFetcher::new()
                .fail(PRIMARY, "connection reset")
                .ok(MIRROR, OVERPASS_BODY),
        );
        let geo = GeoDiscovery::new(stub.clone(), &geo_config());

        let pois = geo.find_pois("mount pleasant", Some("ramen")).await;
        assert_eq!(pois.len(), 2);
        assert_eq!(stub.calls(), vec![PRIMARY, PRIMARY, MIRROR]);
    }

    #[tokio::test]
    async fn exhausted_endpoints_yield_empty_list() {
        let stub = Arc::new(
            StubFetcher::new()
                .fail(PRIMARY, "timeout")
                .fail(MIRROR, "HTTP 504"),
        );
        let policy = RetryPolicy {
            max_attempts_per_endpoint: 3,
            backoff_base: Duration::ZERO,
        };
        let geo = GeoDiscovery::new(stub.clone(), &geo_config()).with_policy(policy);

        assert!(geo.find_pois("downtown", None).await.is_empty());
        assert_eq!(stub.calls().len(), 6);
    }

    #[tokio::test]
    async fn unparseable_body_is_retried_then_fails_over() {
        let stub = Arc::new(
            StubFetcher::new()
                .ok(PRIMARY, "<html>rate limited</html>")
                .ok(MIRROR, OVERPASS_BODY),
        );
        let geo = GeoDiscovery::new(stub.clone(), &geo_config());

        let pois = geo.find_pois("downtown", None).await;
        assert_eq!(pois.len(), 2);
        assert_eq!(stub.calls(), vec![PRIMARY, PRIMARY, MIRROR]);
    }

    #[tokio::test]
    async fn unparseable_bodies_everywhere_yield_empty_list() {
        let stub = Arc::new(
            StubFetcher::new()
                .ok(PRIMARY, "<html>rate limited</html>")
                .ok(MIRROR, "Bad Gateway"),
        );
        let geo = GeoDiscovery::new(stub.clone(), &geo_config());
        assert!(geo.find_pois("downtown", None).await.is_empty());
        assert_eq!(stub.calls().len(), 4);
    }
}
