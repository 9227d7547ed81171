//! Core data models used throughout Larder.
//!
//! These types represent the areas, places, page text, and recipe records
//! that flow through the discovery, extraction, and caching pipeline.

use serde::Serialize;

/// A lat/lon rectangle, ordered `(south, west, north, east)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// `south < north` and `west < east`.
    pub fn is_valid(&self) -> bool {
        self.south < self.north && self.west < self.east
    }

    /// Overpass bbox filter: `(south,west,north,east)`.
    pub fn to_overpass(&self) -> String {
        format!("({},{},{},{})", self.south, self.west, self.north, self.east)
    }
}

/// A named place returned by the geo-query service. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointOfInterest {
    pub name: String,
    pub address: String,
    pub website: Option<String>,
    pub source_id: i64,
}

/// Which retrieval path produced a piece of page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOrigin {
    Static,
    Rendered,
}

impl std::fmt::Display for TextOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextOrigin::Static => write!(f, "static"),
            TextOrigin::Rendered => write!(f, "rendered"),
        }
    }
}

/// Cleaned visible text of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub origin: TextOrigin,
}

impl ExtractedText {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Recipe fields parsed from a page, before handoff to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    pub url: String,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub total_time: Option<String>,
}

/// A cached record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub total_time: Option<String>,
}
