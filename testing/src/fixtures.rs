//! Shared configurations for tests.

use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use typed_store_core::{ModuleConfig, Payload, StoreError};

/// Install a `tracing` subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory log sink shared between a subscriber and the test reading it.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber using `filter` (`EnvFilter` syntax) and
/// return everything it formatted, without ANSI colors.
///
/// Only events emitted on the calling thread are captured.
pub fn capture_logs<F: FnOnce()>(filter: &str, f: F) -> String {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap_or_else(PoisonError::into_inner).clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Set `state.title` from `payload.title`.
///
/// # Errors
///
/// Returns [`StoreError::MutationFailed`] when the payload has no `title`.
pub fn set_title(state: &mut Payload, payload: Option<&Payload>) -> Result<(), StoreError> {
    let title = payload
        .and_then(|p| p.get("title"))
        .ok_or_else(|| StoreError::MutationFailed("setTitle requires a title".to_string()))?;
    state["title"] = title.clone();
    Ok(())
}

/// Increment the integer at `state.value`.
///
/// # Errors
///
/// Never fails; the signature matches the mutation handler shape.
pub fn bump(state: &mut Payload, _payload: Option<&Payload>) -> Result<(), StoreError> {
    let next = state["value"].as_i64().unwrap_or(0) + 1;
    state["value"] = json!(next);
    Ok(())
}

/// Root configuration with a title, a `setTitle` mutation, an `upperTitle` getter and a
/// `payload` action that sets the title and resolves to `42`.
#[must_use]
pub fn title_store() -> ModuleConfig {
    ModuleConfig::new()
        .state(json!({ "title": "Hello, world!" }))
        .getter("upperTitle", |ctx| {
            Ok(json!(ctx.state()["title"].as_str().unwrap_or_default().to_uppercase()))
        })
        .mutation("setTitle", set_title)
        .action("payload", |ctx, payload| async move {
            ctx.commit("setTitle", payload)?;
            Ok::<_, StoreError>(json!(42))
        })
}

/// Module with `value: 0`, a `bump` mutation, a `double` getter and a `bumpTwice` action.
#[must_use]
pub fn counter_module(namespaced: bool) -> ModuleConfig {
    ModuleConfig::new()
        .namespaced(namespaced)
        .state(json!({ "value": 0 }))
        .getter("double", |ctx| {
            Ok(json!(ctx.state()["value"].as_i64().unwrap_or(0) * 2))
        })
        .mutation("bump", bump)
        .action("bumpTwice", |ctx, _payload| async move {
            ctx.commit("bump", None)?;
            ctx.commit("bump", None)?;
            Ok::<_, StoreError>(ctx.state()?["value"].clone())
        })
}
