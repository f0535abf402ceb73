//! Reconciliation engine for remotely managed entities.
//!
//! A [`Reconciler`] takes the desired configuration of one entity out of a
//! [`ConfigStore`], drives the remote control plane toward it through a
//! [`RemoteEntityClient`], and writes the observed state and the entity's
//! identifier back. It detects drift (the entity, its owner or its required
//! association disappearing out of band) and merges provider-wide default
//! tags with the tags each entity declares.
//!
//! Entity kinds plug in through [`EntityKind`]; two ship with the crate:
//! [`AppCookieStickinessPolicy`] and [`PlaceIndex`].
//!
//! # Example
//!
//! ```no_run
//! use driftguard_engine::{
//!     AppCookieStickinessPolicy, ConfigStore, InMemoryControlPlane, MemoryConfigStore,
//!     ProviderConfig, Reconciler,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let plane = Arc::new(InMemoryControlPlane::default());
//! plane.add_load_balancer("web", &[80]).await;
//!
//! let reconciler =
//!     Reconciler::<AppCookieStickinessPolicy>::new(plane, &ProviderConfig::default())?;
//! let mut store = MemoryConfigStore::new(json!({
//!     "name": "sticky",
//!     "load_balancer": "web",
//!     "lb_port": 80,
//!     "cookie_name": "session",
//! }));
//! reconciler.create(&mut store).await?;
//! assert_eq!(store.current_identifier().as_deref(), Some("web:80:sticky"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod kinds;
pub mod logging;
pub mod reconciler;
pub mod schema;
pub mod store;

pub use client::{
    CallKind, InMemoryControlPlane, NotFoundScope, RemoteEntityClient, RemoteError, RemoteResult,
};
pub use config::{ConfigError, ProviderConfig};
pub use error::{Operation, ReconcileError, ReconcileResult};
pub use kinds::{
    AppCookieStickinessPolicy, EntityKind, PlaceIndex, PlaceIndexConfig, StickinessPolicyConfig,
};
pub use logging::{init_logging, try_init_logging};
pub use reconciler::{DriftCause, LifecycleState, ReadOutcome, Reconciler};
pub use store::{ConfigStore, MemoryConfigStore};
