//! # ferrous-lifespan
//!
//! Request-scoped versus application-lifetime service instances for an
//! axum web API.
//!
//! Services are registered with a per-request default factory. While the
//! application [`Lifespan`] is open it may install an override that hands
//! every request the same shared instance; shutting the lifespan down
//! removes the override again.
//!
//! ## Features
//!
//! - **Override table**: set-default insert, idempotent removal, consulted
//!   before every default registration
//! - **Lifespan**: overrides installed at startup, removed at shutdown,
//!   followed by shutdown callbacks in reverse order
//! - **Request context**: an immutable per-request snapshot passed into the
//!   service chain, never stored on shared instances
//! - **Layered services**: a fetch, enrich and finalize pipeline per endpoint
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lifespan::{Lifespan, Resolver, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct RequestId(u32);
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let mut services = ServiceCollection::new();
//! services.add_scoped_factory::<RequestId, _>(|_| RequestId(7));
//! let provider = services.build();
//!
//! // Without a lifespan every scope builds its own instance.
//! let a = provider.create_scope().get_required::<RequestId>();
//! let b = provider.create_scope().get_required::<RequestId>();
//! assert!(!Arc::ptr_eq(&a, &b));
//!
//! // While the lifespan is open, all scopes share one instance.
//! let mut lifespan = Lifespan::startup(&provider);
//! lifespan.install(Arc::new(RequestId(0)));
//! assert_eq!(provider.create_scope().get_required::<RequestId>().0, 0);
//!
//! lifespan.shutdown().await;
//! assert_eq!(provider.create_scope().get_required::<RequestId>().0, 7);
//! # });
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: Created once and shared across the entire application
//! - **Scoped**: Created once per scope, and the web layer opens one scope
//!   per request

pub mod app;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod key;
pub mod lifespan;
pub mod lifetime;
pub mod logging;
pub mod overrides;
pub mod pipeline;
pub mod provider;
pub mod services;
pub mod traits;
pub mod web;

// Internal modules
mod internal;
mod registration;

pub use app::Application;
pub use collection::ServiceCollection;
pub use config::{AppConfig, LogFormat, Variant};
pub use context::RequestContext;
pub use error::{DiError, DiResult, ServiceError, ServiceResult};
pub use key::{key_of_named, key_of_type, Key};
pub use lifespan::Lifespan;
pub use lifetime::Lifetime;
pub use overrides::OverrideTable;
pub use pipeline::{Payload, Pipeline, Stage};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use registration::AnyArc;
pub use services::{AnalyticsService, DataService, LayeredService};
pub use traits::{Resolver, ResolverCore};
