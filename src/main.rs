//! # Larder CLI (`larder`)
//!
//! The `larder` binary drives local food discovery and the recipe cache.
//!
//! ## Usage
//!
//! ```bash
//! larder --config ./config/larder.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `larder init` | Create the SQLite store |
//! | `larder discover <area>` | List restaurants in a neighbourhood |
//! | `larder robots <url>` | Check robots.txt for a URL |
//! | `larder extract <url>` | Print the readable text of a page |
//! | `larder scout <area>` | Discover, check, and extract menu text |
//! | `larder fetch <url>` | Harvest one recipe page into the store |
//! | `larder search "<query>"` | Keyword search over stored recipes |
//! | `larder live "<query>"` | Search the source, harvest, and show results |
//! | `larder random` | Show a random stored recipe |
//! | `larder count` / `list` / `get <id>` | Inspect the store |
//! | `larder stats` | Store size and field coverage |
//! | `larder seed urls|terms <FILE>` | Bulk harvesting |
//!
//! Command output goes to stdout. Logs and seeding progress go to stderr;
//! set `RUST_LOG` (default `larder=info`) to change verbosity.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use larder::config::{self, Config};
use larder::extract::ContentExtractor;
use larder::geo::GeoDiscovery;
use larder::get;
use larder::harvest::{self, RecordHarvester};
use larder::http::HttpFetcher;
use larder::progress::ProgressMode;
use larder::robots::RobotsGate;
use larder::scout::Scout;
use larder::stats;
use larder::store::LocalStore;

/// Larder: local food discovery and a local recipe cache.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/larder.example.toml` for every setting.
#[derive(Parser)]
#[command(
    name = "larder",
    about = "Larder: local food discovery and a local recipe cache",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/larder.toml`. A missing file means all defaults.
    #[arg(long, global = true, default_value = "./config/larder.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store and its table. Safe to run repeatedly.
    Init,

    /// List named restaurants in an area via the Overpass API.
    ///
    /// Unknown area names fall back to the whole region.
    Discover {
        /// Neighbourhood name, e.g. `kitsilano`, `mt pleasant`.
        area: String,

        /// Cuisine filter, e.g. `ramen`.
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Check whether robots.txt allows fetching a URL.
    Robots {
        url: String,

        /// User agent to evaluate. Defaults to `[http].robots_agent`.
        #[arg(long)]
        agent: Option<String>,
    },

    /// Print the cleaned visible text of a page.
    Extract {
        url: String,

        #[arg(long)]
        json: bool,
    },

    /// Discover places, check robots.txt, and extract their menu text.
    Scout {
        area: String,

        #[arg(long)]
        category: Option<String>,

        /// Maximum number of places (with websites) to visit.
        #[arg(long, default_value_t = 5)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// Harvest one recipe page into the store.
    Fetch { url: String },

    /// Keyword search over stored recipes (every keyword must match).
    Search {
        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Search the source site, harvest result pages, and show them.
    Live {
        query: String,

        /// Maximum result pages to harvest. Defaults to `[search].max_results`.
        #[arg(long)]
        max: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show one random stored recipe.
    Random {
        #[arg(long)]
        json: bool,
    },

    /// Print the number of stored recipes.
    Count,

    /// Show a stored recipe by id.
    Get {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// List every stored recipe, ordered by title.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Store location, size, and field coverage.
    Stats,

    /// Bulk harvesting from a file.
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Harvest every URL in FILE (one per line, `#` comments allowed).
    Urls {
        file: PathBuf,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Run a live search for every term in FILE.
    Terms {
        file: PathBuf,

        /// Result pages per term. Defaults to `[search].max_results`.
        #[arg(long)]
        max: Option<usize>,

        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("larder=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = LocalStore::open(&cfg.db.path).await?;
            println!("Store initialized at {}", store.path().display());
            store.close().await;
        }
        Commands::Discover {
            area,
            category,
            json,
        } => {
            let geo = GeoDiscovery::from_config(&cfg.geo, &cfg.http.user_agent)?;
            let pois = geo.find_pois(&area, category.as_deref()).await;
            if json {
                get::print_json(&pois)?;
            } else if pois.is_empty() {
                println!("No places found.");
            } else {
                for poi in &pois {
                    println!(
                        "{}  |  {}  |  {}",
                        poi.name,
                        if poi.address.is_empty() { "-" } else { poi.address.as_str() },
                        poi.website.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Commands::Robots { url, agent } => {
            let agent = agent.unwrap_or_else(|| cfg.http.robots_agent.clone());
            let gate = RobotsGate::new(Arc::new(HttpFetcher::new(
                &cfg.http.user_agent,
                cfg.http.timeout(),
            )?));
            let allowed = gate.is_allowed(&url, &agent).await;
            println!(
                "{} for agent '{}': {}",
                if allowed { "allowed" } else { "disallowed" },
                agent,
                url
            );
        }
        Commands::Extract { url, json } => {
            let extractor = ContentExtractor::from_config(&cfg)?;
            let extracted = extractor.extract_text(&url).await;
            if json {
                get::print_json(&extracted)?;
            } else {
                println!("origin: {}  chars: {}", extracted.origin, extracted.char_len());
                println!();
                println!("{}", extracted.text);
            }
        }
        Commands::Scout {
            area,
            category,
            limit,
            json,
        } => {
            let scout = Scout::from_config(&cfg)?;
            let places = scout.scout(&area, category.as_deref(), limit).await;
            if json {
                get::print_json(&places)?;
            } else if places.is_empty() {
                println!("No places with websites found.");
            } else {
                for place in &places {
                    println!("=== {} ===", place.poi.name);
                    if !place.poi.address.is_empty() {
                        println!("address: {}", place.poi.address);
                    }
                    println!("website: {}", place.poi.website.as_deref().unwrap_or("-"));
                    match &place.text {
                        None => println!("(robots.txt disallows fetching)"),
                        Some(text) if text.is_empty() => println!("(no text could be extracted)"),
                        Some(text) => {
                            println!("origin:  {}  chars: {}", text.origin, text.char_len());
                            println!();
                            println!("{}", text.text);
                        }
                    }
                    println!();
                }
            }
        }
        Commands::Fetch { url } => {
            let store = LocalStore::open(&cfg.db.path).await?;
            let harvester = RecordHarvester::from_config(&cfg, store.clone())?;
            if harvester.fetch_and_store(&url).await {
                println!("inserted: {}", url);
            } else {
                println!("skipped: {} (already stored, or no recipe found)", url);
            }
            store.close().await;
        }
        Commands::Search { query, json } => {
            let store = LocalStore::open(&cfg.db.path).await?;
            let records = store.search_by_keywords(&query).await?;
            get::print_records(&records, json)?;
            store.close().await;
        }
        Commands::Live { query, max, json } => {
            let store = LocalStore::open(&cfg.db.path).await?;
            let harvester = RecordHarvester::from_config(&cfg, store.clone())?;
            let max = max.unwrap_or(harvester.max_results());
            let records = harvester.live_search(&query, max).await?;
            get::print_records(&records, json)?;
            store.close().await;
        }
        Commands::Random { json } => {
            let store = LocalStore::open(&cfg.db.path).await?;
            get::run_random(&store, json).await?;
            store.close().await;
        }
        Commands::Count => {
            let store = LocalStore::open(&cfg.db.path).await?;
            println!("{}", store.count().await?);
            store.close().await;
        }
        Commands::Get { id, json } => {
            let store = LocalStore::open(&cfg.db.path).await?;
            let result = get::run_get(&store, id, json).await;
            store.close().await;
            result?;
        }
        Commands::List { json } => {
            let store = LocalStore::open(&cfg.db.path).await?;
            let records = store.all_records().await?;
            get::print_records(&records, json)?;
            store.close().await;
        }
        Commands::Stats => {
            let store = LocalStore::open(&cfg.db.path).await?;
            stats::run_stats(&store).await?;
            store.close().await;
        }
        Commands::Seed { action } => run_seed(&cfg, action).await?,
    }

    Ok(())
}

async fn run_seed(cfg: &Config, action: SeedAction) -> Result<()> {
    let store = LocalStore::open(&cfg.db.path).await?;
    let harvester = RecordHarvester::from_config(cfg, store.clone())?;

    match action {
        SeedAction::Urls { file, progress } => {
            let urls = read_seed_file(&file)?;
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            let added = harvester.seed_urls(&urls, reporter.as_ref()).await;
            println!("Added {} new records from {} URLs.", added, urls.len());
        }
        SeedAction::Terms {
            file,
            max,
            progress,
        } => {
            let terms = read_seed_file(&file)?;
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            let max = max.unwrap_or(harvester.max_results());
            let added = harvester
                .seed_terms(&terms, max, reporter.as_ref())
                .await?;
            println!("Added {} new records from {} terms.", added, terms.len());
        }
    }

    store.close().await;
    Ok(())
}

fn read_seed_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
    Ok(harvest::read_list(&content))
}
