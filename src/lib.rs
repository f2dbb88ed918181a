//! # school-api
//!
//! REST API over teachers (`Professeur`), students (`Eleve`) and classes
//! (`Classe`), with role-based access, tag-invalidated caching of list pages,
//! HATEOAS links and versioned JSON representations.
//!
//! ## Layers
//!
//! - **Store:** SQLite through sqlx ([`repository::Store`]), one
//!   [`repository::SqliteRepository`] per entity type
//! - **Cache:** [`cache::TagAwareCache`] over a [`backend::CacheBackend`];
//!   every list page is tagged with its resource and evicted on writes
//! - **Serialization:** descriptor tables per type, filtered by group and
//!   [`versioning::ApiVersion`] ([`serializer`])
//! - **HTTP:** axum router in [`api`], JWT bearer auth in [`auth`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use school_api::{api, config::AppConfig, db, repository::Store};
//!
//! let config = AppConfig::from_env()?;
//! let store = Store::new(db::connect(&config).await?);
//! let app = api::router(api::AppState::new(&config, store));
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//! axum::serve(listener, app).await?;
//! ```

#[macro_use]
extern crate log;

pub mod api;
pub mod auth;
pub mod backend;
pub mod cache;
pub mod config;
pub mod db;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod hateoas;
pub mod key;
pub mod observability;
pub mod repository;
pub mod resource;
pub mod seed;
pub mod serializer;
pub mod validation;
pub mod versioning;

// Re-exports for convenience
pub use api::{router, AppState};
pub use backend::CacheBackend;
pub use cache::TagAwareCache;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use repository::{DataRepository, Store};
pub use resource::Resource;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
