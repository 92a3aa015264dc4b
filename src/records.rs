//! Best completion times
//!
//! Persisted as JSON, keyed by level title, keeps the fastest few runs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of times kept per level
pub const MAX_TIMES: usize = 5;

/// A single finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Seconds from (re)start to the finish line
    pub time: f32,
    /// Crashes along the way
    pub deaths: u32,
}

/// Per-level leaderboards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestTimes {
    pub levels: BTreeMap<String, Vec<TimeEntry>>,
}

impl BestTimes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, level: &str) -> &[TimeEntry] {
        self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if a time makes the board for a level
    pub fn qualifies(&self, level: &str, time: f32) -> bool {
        if !(time.is_finite() && time > 0.0) {
            return false;
        }
        let entries = self.entries(level);
        entries.len() < MAX_TIMES || entries.last().is_none_or(|e| time < e.time)
    }

    /// Record a finished run. Returns the rank achieved (1-indexed).
    pub fn add_time(&mut self, level: &str, time: f32, deaths: u32) -> Option<usize> {
        if !self.qualifies(level, time) {
            return None;
        }
        let entries = self.levels.entry(level.to_string()).or_default();

        // Sorted ascending; ties keep the older run first
        let pos = entries
            .iter()
            .position(|e| time < e.time)
            .unwrap_or(entries.len());
        entries.insert(pos, TimeEntry { time, deaths });
        entries.truncate(MAX_TIMES);
        Some(pos + 1)
    }

    pub fn best(&self, level: &str) -> Option<f32> {
        self.entries(level).first().map(|e| e.time)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.values().all(Vec::is_empty)
    }

    /// Load records from a JSON file, starting fresh if missing or unreadable
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if let Ok(json) = std::fs::read_to_string(path) {
            match serde_json::from_str::<BestTimes>(&json) {
                Ok(records) => {
                    log::info!("Loaded best times for {} levels", records.levels.len());
                    return records;
                }
                Err(e) => log::warn!("Ignoring bad records file {}: {}", path.display(), e),
            }
        }

        log::info!("No best times found, starting fresh");
        Self::new()
    }

    pub fn save(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match serde_json::to_string(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    log::warn!("Failed to save best times to {}: {}", path.display(), e);
                } else {
                    log::info!("Best times saved ({} levels)", self.levels.len());
                }
            }
            Err(e) => log::warn!("Failed to serialize best times: {}", e),
        }
    }
}

/// Format seconds as `m:ss.cc`
pub fn format_time(seconds: f32) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    format!("{}:{:02}.{:02}", centis / 6000, (centis / 100) % 60, centis % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_and_trim() {
        let mut records = BestTimes::new();
        assert!(records.is_empty());
        assert_eq!(records.add_time("hill", 30.0, 0), Some(1));
        assert_eq!(records.add_time("hill", 20.0, 2), Some(1));
        assert_eq!(records.add_time("hill", 25.0, 1), Some(2));
        assert_eq!(records.best("hill"), Some(20.0));

        for t in [40.0, 41.0, 42.0] {
            records.add_time("hill", t, 0);
        }
        assert_eq!(records.entries("hill").len(), MAX_TIMES);
        assert!(!records.qualifies("hill", 50.0));
        assert_eq!(records.add_time("hill", 50.0, 0), None);
        assert_eq!(records.best("other"), None);
    }

    #[test]
    fn test_rejects_nonsense_times() {
        let mut records = BestTimes::new();
        assert_eq!(records.add_time("hill", 0.0, 0), None);
        assert_eq!(records.add_time("hill", f32::NAN, 0), None);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00.00");
        assert_eq!(format_time(65.32), "1:05.32");
        assert_eq!(format_time(600.0), "10:00.00");
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("sled_rush_times_{}.json", std::process::id()));
        let mut records = BestTimes::new();
        records.add_time("hill", 12.5, 3);
        records.save(&path);
        assert_eq!(BestTimes::load(&path), records);
        let _ = std::fs::remove_file(&path);
    }
}
