//! # Typed Store Core
//!
//! Core traits and types for typed, namespaced proxies over a state store engine.
//!
//! This crate defines everything the proxy layer and the engines agree on:
//!
//! - **Payload**: JSON values carried by commits, dispatches, state and getters
//! - **`StoreEngine`**: the narrow boundary every engine implements
//! - **`ModuleConfig`**: declarative state, getters, mutations, actions and child modules
//! - **Namespaces**: how handler names become qualified engine keys
//! - **State view**: how a module path locates its state inside the root tree
//! - **Subscription**: idempotent unsubscribe handles
//!
//! ## Namespacing
//!
//! A handler's engine key is its configured name prefixed by its module's namespace.
//! A namespaced module appends its own name to the parent's namespace; a module that is
//! not namespaced shares the parent's namespace, so its handlers register alongside the
//! parent's.
//!
//! ```text
//! root                         namespace ""      keys: setTitle
//! ├── cart (namespaced)        namespace "cart"  keys: cart/add
//! │   └── items (plain)        namespace "cart"  keys: cart/clear
//! └── ui (plain)               namespace ""      keys: toggle
//! ```
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use typed_store_core::{ModuleConfig, qualify};
//!
//! let config = ModuleConfig::new()
//!     .state(json!({ "title": "Hello, world!" }))
//!     .mutation("setTitle", |state, payload| {
//!         if let Some(title) = payload.and_then(|p| p.get("title")) {
//!             state["title"] = title.clone();
//!         }
//!         Ok(())
//!     });
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(qualify("setTitle", "cart"), "cart/setTitle");
//! ```

/// Dynamic value carried through the engine boundary.
pub type Payload = serde_json::Value;

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod namespace;
pub mod state;
pub mod subscription;

// Re-export commonly used types
pub use config::{ActionFn, GetterFn, ModuleConfig, MutationFn};
pub use context::{ActionContext, GetterContext, GetterLookup};
pub use engine::{
    ActionEvent, ActionFuture, ActionHook, ActionSubscriber, CommitOptions, DispatchOptions,
    MutationEvent, MutationListener, RegisterOptions, StoreEngine, WatchCallback, WatchGetter,
    WatchOptions,
};
pub use error::{ConfigError, HandlerKind, StoreError};
pub use namespace::{child_namespace, qualify};
pub use state::{resolve_state, resolve_state_mut};
pub use subscription::Subscription;
pub use serde_json::json;
