//! # Typed Store Testing
//!
//! Engines and helpers for testing code built on typed-store.
//!
//! This crate provides:
//! - [`InMemoryEngine`]: a complete reference store engine
//! - [`RecordingEngine`]: an engine double that records calls and lets tests emit events
//! - [`LoggerPlugin`]: a `tracing` logger for mutations and actions
//! - [`fixtures`]: shared configurations and tracing setup
//!
//! ## Example
//!
//! ```ignore
//! use typed_store_runtime::StoreWrapper;
//! use typed_store_testing::{InMemoryEngine, fixtures};
//!
//! #[tokio::test]
//! async fn test_title_flow() {
//!     let engine = InMemoryEngine::new(fixtures::title_store()).unwrap();
//!     let store = StoreWrapper::new(engine, &fixtures::title_store()).unwrap();
//!
//!     store.mutations().get("setTitle").unwrap().call(&json!({ "title": "x" })).unwrap();
//!     assert_eq!(store.state().unwrap()["title"], "x");
//! }
//! ```

pub mod config;
pub mod engine;
pub mod fixtures;
pub mod logger;
pub mod recording;

// Re-export commonly used items
pub use config::{EngineConfig, EnginePlugin};
pub use engine::InMemoryEngine;
pub use logger::LoggerPlugin;
pub use recording::{RecordedCall, RecordingEngine};
