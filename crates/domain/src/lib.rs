//! # ondushub-domain
//!
//! Pure domain model for the ondushub bridge.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Accessories** (one per cloud appliance) and the **Services** they expose
//! - Define **Characteristics** (typed properties such as current temperature or
//!   leak detected) and their values
//! - Define **Events** (registration, characteristic changes, vendor notifications)
//! - Define **History** entries (measurement samples kept per accessory)
//! - Contain all invariant enforcement
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod accessory;
pub mod characteristic;
pub mod event;
pub mod history;
pub mod service;
