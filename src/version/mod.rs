//! Version resolution layer
//!
//! Fetches version records from the catalog, validates them, follows their
//! required dependencies and caches every decision in SQLite.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Catalog   │────▶│   Fetcher   │────▶│  Resolver   │
//! │  (modrinth) │     │ (segments)  │     │  (closure)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                           │       │
//!                                           ▼       ▼
//!                                   ┌─────────┐ ┌─────────┐
//!                                   │  Store  │ │  Stack  │
//!                                   │(sqlite) │ │ (memo)  │
//!                                   └─────────┘ └─────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`]: Catalog trait for fetching raw records
//! - [`modrinth`]: Modrinth HTTP implementation of the catalog
//! - [`fetcher`]: Segmented, concurrency-limited batch fetching
//! - [`validate`]: Shape validation of raw version records
//! - [`stack`]: Per-request memo table and invalidity propagation
//! - [`resolver`]: Dependency closure over store and catalog
//! - [`store`]: SQLite-backed store of valid and invalid versions
//! - [`error`]: Error types for store, catalog and validation
//! - [`types`]: Version record types

pub mod catalog;
pub mod error;
pub mod fetcher;
pub mod modrinth;
pub mod resolver;
pub mod stack;
pub mod store;
pub mod types;
pub mod validate;
