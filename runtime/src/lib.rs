//! # Typed Store Runtime
//!
//! Typed, namespaced proxies over a store engine.
//!
//! This crate turns a declarative [`ModuleConfig`](typed_store_core::ModuleConfig)
//! tree into a [`StoreWrapper`]: a state view plus one proxy per configured getter,
//! mutation and action, and one nested wrapper per child module. Proxies hold no state
//! of their own; every call is routed to the shared engine under the handler's
//! qualified key.
//!
//! ## Core Components
//!
//! - **Getter proxies**: read a getter's current value from the engine
//! - **Mutation proxies**: commit a mutation and `listen` to its commits
//! - **Action proxies**: dispatch an action and hook it `before` / `after`
//! - **Module tree**: child wrappers with derived namespaces and state paths
//! - **Store Wrapper**: the assembled tree, plus engine pass-through operations
//! - **Host injection**: binds wrappers to host components behind an install token
//!
//! ## Example
//!
//! ```ignore
//! use typed_store_runtime::StoreWrapper;
//! use typed_store_testing::InMemoryEngine;
//!
//! let engine = InMemoryEngine::new(config.clone())?;
//! let store = StoreWrapper::new(engine, &config)?;
//!
//! store.mutations().get("setTitle").unwrap().call(&json!({ "title": "x" }))?;
//! let counter = store.module("m").unwrap();
//! counter.mutations().commit("bump", None)?;
//!
//! let answer = store.actions().dispatch("payload", Some(json!({ "title": "z" }))).await?;
//! ```

/// Action proxies
pub mod actions;

/// Getter proxies
pub mod getters;

/// Host-framework injection with an install token
pub mod host;

/// Prometheus metrics for observability
pub mod metrics;

/// Recursive module wrapper construction
pub mod modules;

/// Mutation proxies
pub mod mutations;

/// Named proxy collections
pub mod proxy;

/// The Store Wrapper
pub mod wrapper;

pub use actions::{ActionProxy, Actions, build_actions};
pub use getters::{GetterProxy, Getters, build_getters};
pub use host::{
    Component, ComponentOptions, HostError, HostRuntime, InstallToken, StoreFactory,
    StorePlugin, StoreSource,
};
pub use modules::build_modules;
pub use mutations::{MutationProxy, Mutations, build_mutations};
pub use proxy::ProxySet;
pub use wrapper::StoreWrapper;
