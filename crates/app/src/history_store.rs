//! In-memory measurement history.
//!
//! Each accessory keeps a bounded series ordered by sample time; once the
//! series is full the oldest samples are dropped.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use ondushub_domain::error::OndusHubError;
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::time::Timestamp;

use crate::ports::HistoryRepository;

/// Samples kept per accessory (two weeks of 5-minute samples).
pub const DEFAULT_CAPACITY: usize = 4032;

/// [`HistoryRepository`] keeping one time-ordered series per accessory.
pub struct InMemoryHistory {
    capacity: usize,
    series: RwLock<HashMap<AccessoryId, BTreeMap<Timestamp, HistoryEntry>>>,
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` samples per accessory.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            series: RwLock::new(HashMap::new()),
        }
    }
}

impl HistoryRepository for InMemoryHistory {
    async fn record(&self, entries: Vec<HistoryEntry>) -> Result<usize, OndusHubError> {
        let mut guard = self.series.write().await;
        let mut added = 0;
        for entry in entries {
            let series = guard.entry(entry.accessory_id).or_default();
            if series.insert(entry.recorded_at, entry).is_none() {
                added += 1;
            }
            while series.len() > self.capacity {
                series.pop_first();
            }
        }
        Ok(added)
    }

    async fn find_by_accessory_in_range(
        &self,
        accessory_id: AccessoryId,
        from: Timestamp,
        to: Timestamp,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, OndusHubError> {
        if from > to {
            return Ok(Vec::new());
        }
        let guard = self.series.read().await;
        let Some(series) = guard.get(&accessory_id) else {
            return Ok(Vec::new());
        };
        let in_range = series.range(from..=to).map(|(_, entry)| entry);
        let found = match limit {
            Some(limit) => {
                let mut latest: Vec<HistoryEntry> = in_range.rev().take(limit).cloned().collect();
                latest.reverse();
                latest
            }
            None => in_range.cloned().collect(),
        };
        Ok(found)
    }
}
