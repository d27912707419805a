//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod accessory_repo;
pub mod event_bus;
pub mod history_repo;
pub mod platform;

pub use accessory_repo::AccessoryRepository;
pub use event_bus::EventPublisher;
pub use history_repo::HistoryRepository;
pub use platform::{Platform, PlatformContext};
