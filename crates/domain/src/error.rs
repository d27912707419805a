//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`OndusHubError`] via `From` when crossing a port boundary.

use crate::characteristic::Characteristic;
use crate::service::ServiceKind;

/// Boxed error coming from an adapter (cloud API, transport, …).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error returned through the application ports.
#[derive(Debug, thiserror::Error)]
pub enum OndusHubError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested object does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// An integration (e.g. the vendor cloud) failed to fulfil a request.
    #[error("integration error")]
    Integration(#[source] BoxedError),
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A display name was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An accessory was built without a vendor unique id.
    #[error("unique id must not be empty")]
    EmptyUniqueId,

    /// The same service kind was added twice to one accessory.
    #[error("service {0} is declared more than once")]
    DuplicateService(ServiceKind),

    /// A write targeted a characteristic that cannot be written.
    #[error("characteristic {characteristic} of service {service} is read-only")]
    ReadOnly {
        /// Service the write was addressed to.
        service: ServiceKind,
        /// Characteristic the write was addressed to.
        characteristic: Characteristic,
    },

    /// A written value does not have the expected type.
    #[error("invalid value for characteristic {0}")]
    InvalidValue(Characteristic),

    /// An identifier could not be parsed.
    #[error("malformed identifier {0:?}")]
    MalformedId(String),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    /// A time range ends before it starts.
    #[error("time range ends before it starts")]
    InvalidTimeRange,
}

/// A lookup that came back empty.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of object that was looked up (e.g. `"Accessory"`).
    pub entity: &'static str,
    /// Identifier that was looked up.
    pub id: String,
}
