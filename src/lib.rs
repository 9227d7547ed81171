//! # Larder
//!
//! Local-area food discovery and a local recipe cache.
//!
//! Larder finds restaurants in a named neighbourhood through the OpenStreetMap
//! Overpass API, checks each site's robots.txt, and pulls readable menu text
//! (escalating to a headless browser for client-rendered pages). Separately,
//! it harvests schema.org recipes from a search source into a SQLite cache
//! that supports keyword search and random picks.
//!
//! ## Architecture
//!
//! ```text
//!  area ──▶ GeoDiscovery ──▶ RobotsGate ──▶ ContentExtractor ──▶ text
//!            (Overpass)      (robots.txt)   (static │ rendered)
//!
//!  query ──▶ RecordHarvester ──▶ schema (JSON-LD) ──▶ LocalStore (SQLite)
//!            (search page,                              │
//!             candidate links)                          ▼
//!                                          search / random / get / list
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! larder init                         # create the store
//! larder live "cajun soup"            # harvest and show matching recipes
//! larder search "cajun soup"          # search the local cache
//! larder scout kitsilano --category ramen
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`store`] | Record cache |
//! | [`http`] | Fetcher seam and reqwest client |
//! | [`geo`] | Area resolution and Overpass discovery |
//! | [`robots`] | robots.txt gate |
//! | [`clean`] | HTML to text |
//! | [`render`] | Headless browser rendering |
//! | [`extract`] | Static/rendered text extraction |
//! | [`schema`] | JSON-LD recipe parsing |
//! | [`harvest`] | Fetch-and-store, live search, seeding |
//! | [`scout`] | Area to menu text pipeline |
//! | [`progress`] | Seeding progress on stderr |
//! | [`get`] | Record display |
//! | [`stats`] | Store statistics |

pub mod clean;
pub mod config;
pub mod db;
pub mod extract;
pub mod geo;
pub mod get;
pub mod harvest;
pub mod http;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod render;
pub mod robots;
pub mod schema;
pub mod scout;
pub mod stats;
pub mod store;
