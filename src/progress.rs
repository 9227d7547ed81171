//! Seeding progress reporting.
//!
//! `larder seed urls` and `larder seed terms` can run for a long time (two
//! seconds between requests by default). Progress goes to **stderr** so
//! stdout keeps only the final count for scripts.

use serde::Serialize;
use std::io::Write;

/// Which kind of seed input is being processed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedKind {
    Urls,
    Terms,
}

impl std::fmt::Display for SeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedKind::Urls => write!(f, "urls"),
            SeedKind::Terms => write!(f, "terms"),
        }
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum SeedProgressEvent {
    /// Item `n` of `total` finished. `added` is the number of new records it
    /// produced (0 or 1 for a URL, any number for a search term).
    Item {
        kind: SeedKind,
        n: u64,
        total: u64,
        item: String,
        added: u64,
    },
    /// The batch is over.
    Finished { kind: SeedKind, added: u64 },
}

pub trait SeedProgressReporter: Send + Sync {
    fn report(&self, event: SeedProgressEvent);
}

/// Human-friendly progress on stderr: "seed urls  12 / 1,040  +1  https://...".
pub struct StderrProgress;

impl SeedProgressReporter for StderrProgress {
    fn report(&self, event: SeedProgressEvent) {
        let line = match &event {
            SeedProgressEvent::Item {
                kind,
                n,
                total,
                item,
                added,
            } => format!(
                "seed {}  {} / {}  +{}  {}\n",
                kind,
                format_number(*n),
                format_number(*total),
                added,
                item
            ),
            SeedProgressEvent::Finished { kind, added } => {
                format!("seed {}  done, {} new records\n", kind, format_number(*added))
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SeedProgressReporter for JsonProgress {
    fn report(&self, event: SeedProgressEvent) {
        let obj = match &event {
            SeedProgressEvent::Item {
                kind,
                n,
                total,
                item,
                added,
            } => serde_json::json!({
                "event": "progress",
                "kind": kind,
                "n": n,
                "total": total,
                "item": item,
                "added": added
            }),
            SeedProgressEvent::Finished { kind, added } => serde_json::json!({
                "event": "finished",
                "kind": kind,
                "added": added
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl SeedProgressReporter for NoProgress {
    fn report(&self, _event: SeedProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SeedProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects events for assertions.
    #[derive(Default)]
    pub struct RecordingProgress {
        pub events: Mutex<Vec<SeedProgressEvent>>,
    }

    impl RecordingProgress {
        pub fn added_per_item(&self) -> Vec<u64> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    SeedProgressEvent::Item { added, .. } => Some(*added),
                    SeedProgressEvent::Finished { .. } => None,
                })
                .collect()
        }

        pub fn finished(&self) -> Option<u64> {
            self.events.lock().unwrap().iter().find_map(|e| match e {
                SeedProgressEvent::Finished { added, .. } => Some(*added),
                SeedProgressEvent::Item { .. } => None,
            })
        }
    }

    impl SeedProgressReporter for RecordingProgress {
        fn report(&self, event: SeedProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SeedKind::Terms).unwrap(), "\"terms\"");
        assert_eq!(SeedKind::Urls.to_string(), "urls");
    }
}
