//! # ondushub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** over the registered accessories
//!   (`/api/accessories`, `/api/accessories/{id}`) and their measurement
//!   history (`/api/accessories/{id}/history`)
//! - Forward characteristic **GET/SET** requests to the platform so reads
//!   that need live data reach the vendor cloud
//! - Map application errors into HTTP status codes
//!
//! ## Dependency rule
//! Depends on `ondushub-app` (for port traits and services) and
//! `ondushub-domain` (for domain types used in request/response mapping).
//! Never leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
