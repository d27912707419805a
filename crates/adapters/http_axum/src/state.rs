//! Shared application state for axum handlers.

use std::sync::Arc;

use ondushub_app::ports::{AccessoryRepository, EventPublisher, HistoryRepository, Platform};
use ondushub_app::services::accessory_service::AccessoryService;
use ondushub_app::services::history_service::HistoryService;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone`. Only the `Arc` wrappers are cloned.
pub struct AppState<R, EP, HR, P> {
    /// Accessory listing and lookup.
    pub accessory_service: Arc<AccessoryService<R, EP>>,
    /// Measurement history queries.
    pub history_service: Arc<HistoryService<HR>>,
    /// Platform answering characteristic GET/SET.
    pub platform: Arc<P>,
}

impl<R, EP, HR, P> Clone for AppState<R, EP, HR, P> {
    fn clone(&self) -> Self {
        Self {
            accessory_service: Arc::clone(&self.accessory_service),
            history_service: Arc::clone(&self.history_service),
            platform: Arc::clone(&self.platform),
        }
    }
}

impl<R, EP, HR, P> AppState<R, EP, HR, P>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
    P: Platform + 'static,
{
    /// Create a new application state from pre-wrapped `Arc`s.
    ///
    /// The services are shared with the platform context and the platform
    /// with the shutdown path, so all of them arrive already wrapped.
    pub fn new(
        accessory_service: Arc<AccessoryService<R, EP>>,
        history_service: Arc<HistoryService<HR>>,
        platform: Arc<P>,
    ) -> Self {
        Self {
            accessory_service,
            history_service,
            platform,
        }
    }
}
