//! Concrete [`PlatformContext`] backed by application services.

use std::sync::Arc;

use ondushub_domain::accessory::Accessory;
use ondushub_domain::characteristic::{Characteristic, CharacteristicValue};
use ondushub_domain::error::OndusHubError;
use ondushub_domain::event::Event;
use ondushub_domain::history::HistoryEntry;
use ondushub_domain::id::AccessoryId;
use ondushub_domain::service::ServiceKind;

use crate::ports::{AccessoryRepository, EventPublisher, HistoryRepository, PlatformContext};
use crate::services::accessory_service::AccessoryService;
use crate::services::history_service::HistoryService;

/// [`PlatformContext`] implementation that delegates to `AccessoryService`,
/// `HistoryService` and an `EventPublisher`.
///
/// Wraps `Arc`-ed services so it is cheaply cloneable and `Send + Sync`.
/// The generic parameters are confined to this struct; platforms see
/// only the [`PlatformContext`] trait.
pub struct ServiceContext<R, EP, HR> {
    accessory_service: Arc<AccessoryService<R, EP>>,
    history_service: Arc<HistoryService<HR>>,
    event_publisher: EP,
}

impl<R, EP, HR> ServiceContext<R, EP, HR> {
    /// Create a new context backed by the given services and event publisher.
    pub fn new(
        accessory_service: Arc<AccessoryService<R, EP>>,
        history_service: Arc<HistoryService<HR>>,
        event_publisher: EP,
    ) -> Self {
        Self {
            accessory_service,
            history_service,
            event_publisher,
        }
    }
}

impl<R, EP: Clone, HR> Clone for ServiceContext<R, EP, HR> {
    fn clone(&self) -> Self {
        Self {
            accessory_service: Arc::clone(&self.accessory_service),
            history_service: Arc::clone(&self.history_service),
            event_publisher: self.event_publisher.clone(),
        }
    }
}

impl<R, EP, HR> PlatformContext for ServiceContext<R, EP, HR>
where
    R: AccessoryRepository + Send + Sync + 'static,
    EP: EventPublisher + Send + Sync + 'static,
    HR: HistoryRepository + Send + Sync + 'static,
{
    async fn register_accessory(&self, accessory: Accessory) -> Result<Accessory, OndusHubError> {
        self.accessory_service.register_accessory(accessory).await
    }

    async fn update_characteristic(
        &self,
        id: AccessoryId,
        service: ServiceKind,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), OndusHubError> {
        self.accessory_service
            .update_characteristic(id, service, characteristic, value)
            .await
            .map(|_| ())
    }

    async fn publish(&self, event: Event) -> Result<(), OndusHubError> {
        self.event_publisher.publish(event).await
    }

    async fn record_history(&self, entries: Vec<HistoryEntry>) -> Result<(), OndusHubError> {
        self.history_service.record(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory_cache::InMemoryAccessoryCache;
    use crate::event_bus::InProcessEventBus;
    use crate::history_store::InMemoryHistory;
    use ondushub_domain::event::EventType;
    use ondushub_domain::service::Service;
    use ondushub_domain::time::now;

    fn history() -> Arc<HistoryService<InMemoryHistory>> {
        Arc::new(HistoryService::new(InMemoryHistory::new()))
    }

    #[tokio::test]
    async fn should_route_updates_through_accessory_service() {
        let bus = Arc::new(InProcessEventBus::new(16));
        let service = Arc::new(AccessoryService::new(
            InMemoryAccessoryCache::new(),
            Arc::clone(&bus),
        ));
        let ctx = ServiceContext::new(Arc::clone(&service), history(), Arc::clone(&bus));

        let accessory = Accessory::builder()
            .unique_id("guard-1")
            .display_name("Main valve")
            .service(Service::new(ServiceKind::Valve))
            .build()
            .unwrap();
        let registered = ctx.register_accessory(accessory).await.unwrap();

        ctx.update_characteristic(
            registered.id,
            ServiceKind::Valve,
            Characteristic::Active,
            CharacteristicValue::active(true),
        )
        .await
        .unwrap();

        let stored = service.get_accessory(registered.id).await.unwrap();
        assert_eq!(
            stored.characteristic(ServiceKind::Valve, Characteristic::Active),
            Some(&CharacteristicValue::active(true))
        );
    }

    #[tokio::test]
    async fn should_forward_published_events_to_bus() {
        let bus = Arc::new(InProcessEventBus::new(16));
        let service = Arc::new(AccessoryService::new(
            InMemoryAccessoryCache::new(),
            Arc::clone(&bus),
        ));
        let ctx = ServiceContext::new(service, history(), Arc::clone(&bus));
        let mut rx = bus.subscribe();

        ctx.publish(Event::new(
            EventType::NotificationReceived,
            None,
            serde_json::json!({"category": 30, "type": 430}),
        ))
        .await
        .unwrap();

        assert_eq!(
            rx.recv().await.unwrap().event_type,
            EventType::NotificationReceived
        );
    }

    #[tokio::test]
    async fn should_record_history_through_history_service() {
        let bus = Arc::new(InProcessEventBus::new(16));
        let service = Arc::new(AccessoryService::new(
            InMemoryAccessoryCache::new(),
            Arc::clone(&bus),
        ));
        let history = history();
        let ctx = ServiceContext::new(service, Arc::clone(&history), bus);
        let id = AccessoryId::from_unique_id("sense-1");
        let at = now();

        ctx.record_history(vec![
            HistoryEntry::builder(id, at).temperature(Some(20.5)).build(),
        ])
        .await
        .unwrap();

        let found = history.list(id, None, None, None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].temperature, Some(20.5));
    }
}
