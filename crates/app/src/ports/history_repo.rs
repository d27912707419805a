//! History repository port — measurement samples kept per accessory.

use std::future::Future;

use ondushub_domain::error::OndusHubError;
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::time::Timestamp;

/// Stores measurement samples.
pub trait HistoryRepository {
    /// Store samples. A sample replaces an earlier one of the same accessory
    /// taken at the same time. Returns how many samples were new.
    fn record(
        &self,
        entries: Vec<HistoryEntry>,
    ) -> impl Future<Output = Result<usize, OndusHubError>> + Send;

    /// Samples of one accessory taken within `from..=to`, oldest first.
    /// With a `limit`, only the most recent `limit` samples are returned.
    fn find_by_accessory_in_range(
        &self,
        accessory_id: AccessoryId,
        from: Timestamp,
        to: Timestamp,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<HistoryEntry>, OndusHubError>> + Send;
}
