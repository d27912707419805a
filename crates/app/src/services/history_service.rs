//! History service — records measurement samples and answers range queries.

use chrono::Duration;

use ondushub_domain::error::{OndusHubError, ValidationError};
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::time::{Timestamp, now};

use crate::ports::HistoryRepository;

/// Samples returned when no limit is given.
pub const DEFAULT_LIMIT: usize = 1000;

/// Window queried when no start is given, in hours.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Application service for the measurement history.
pub struct HistoryService<HR> {
    repo: HR,
}

impl<HR> HistoryService<HR>
where
    HR: HistoryRepository + Send + Sync,
{
    pub fn new(repo: HR) -> Self {
        Self { repo }
    }

    /// Store samples, skipping those without any value.
    ///
    /// # Errors
    ///
    /// Returns an error propagated from the repository.
    #[tracing::instrument(skip_all, fields(count = entries.len()))]
    pub async fn record(&self, entries: Vec<HistoryEntry>) -> Result<(), OndusHubError> {
        let entries: Vec<HistoryEntry> = entries.into_iter().filter(|e| !e.is_empty()).collect();
        if entries.is_empty() {
            return Ok(());
        }
        let added = self.repo.record(entries).await?;
        tracing::debug!(added, "recorded history samples");
        Ok(())
    }

    /// Samples of one accessory, oldest first.
    ///
    /// `to` defaults to now, `from` to [`DEFAULT_WINDOW_HOURS`] before `to`
    /// and `limit` to [`DEFAULT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeRange`] when `from` is after
    /// `to`, or an error propagated from the repository.
    pub async fn list(
        &self,
        accessory_id: AccessoryId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, OndusHubError> {
        let to = to.unwrap_or_else(now);
        let from = from.unwrap_or_else(|| to - Duration::hours(DEFAULT_WINDOW_HOURS));
        if from > to {
            return Err(ValidationError::InvalidTimeRange.into());
        }
        self.repo
            .find_by_accessory_in_range(accessory_id, from, to, Some(limit.unwrap_or(DEFAULT_LIMIT)))
            .await
    }
}
