//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDate, Utc};

/// UTC timestamp used for `last_updated`, event times, token expiry, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return the current UTC calendar date.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
