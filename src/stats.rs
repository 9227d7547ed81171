//! Store statistics.
//!
//! A quick summary of the cache: how many records, where the file lives, how
//! big it is, and how many records carry the optional fields. Used by
//! `larder stats` to confirm seeding actually produced usable records.

use anyhow::Result;

use crate::progress::format_number;
use crate::store::{FieldCoverage, LocalStore};

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(store: &LocalStore) -> Result<()> {
    let coverage = store.field_coverage().await?;

    let db_size = std::fs::metadata(store.path())
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Larder Store Stats");
    println!("==================");
    println!();
    println!("  Store:       {}", store.path().display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Records:     {}", format_number(coverage.total.max(0) as u64));
    for line in coverage_lines(&coverage) {
        println!("  {}", line);
    }
    println!();

    Ok(())
}

fn coverage_lines(coverage: &FieldCoverage) -> Vec<String> {
    [
        ("Category:", coverage.with_category),
        ("Image:", coverage.with_image),
        ("Time:", coverage.with_time),
    ]
    .iter()
    .map(|(label, n)| {
        format!(
            "{:<12} {} / {} ({}%)",
            label,
            n,
            coverage.total,
            percent(*n, coverage.total)
        )
    })
    .collect()
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
