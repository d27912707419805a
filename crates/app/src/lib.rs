//! # ondushub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `AccessoryRepository` — cache of registered accessories
//!   - `HistoryRepository` — measurement samples kept per accessory
//!   - `EventPublisher` — fan-out of domain events
//!   - `Platform` / `PlatformContext` — the contract between the host and a
//!     vendor platform (discovery, characteristic GET/SET, background polling)
//! - Define **use-case services**:
//!   - `AccessoryService` — register, list, get, update characteristics
//!   - `HistoryService` — record samples, query them by time range
//! - Provide **in-process infrastructure** that doesn't need IO (event bus,
//!   in-memory accessory cache and history)
//!
//! ## Dependency rule
//! Depends on `ondushub-domain` only (plus `tokio::sync` for channels and locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod accessory_cache;
pub mod event_bus;
pub mod history_store;
pub mod ports;
pub mod services;
