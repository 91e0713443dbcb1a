//! State view: locate a module's sub-tree inside the engine's state tree.
//!
//! State is a nested JSON object. A module's state lives under its module name inside
//! its parent's state, so a module path `["cart", "items"]` addresses
//! `root["cart"]["items"]`.

use crate::Payload;
use crate::error::StoreError;
use crate::namespace::join_path;

/// Resolve `path` against `root`.
///
/// An empty path yields `root` itself.
///
/// # Errors
///
/// Returns [`StoreError::StateNotFound`] when a segment is missing or an intermediate
/// node is not an object.
pub fn resolve_state<'a, S: AsRef<str>>(
    path: &[S],
    root: &'a Payload,
) -> Result<&'a Payload, StoreError> {
    let mut node = root;
    for segment in path {
        let segment = segment.as_ref();
        node = node
            .as_object()
            .and_then(|object| object.get(segment))
            .ok_or_else(|| not_found(path, segment))?;
    }
    Ok(node)
}

/// Mutable counterpart of [`resolve_state`].
///
/// # Errors
///
/// Returns [`StoreError::StateNotFound`] when a segment is missing or an intermediate
/// node is not an object.
pub fn resolve_state_mut<'a, S: AsRef<str>>(
    path: &[S],
    root: &'a mut Payload,
) -> Result<&'a mut Payload, StoreError> {
    let mut node = root;
    for segment in path {
        let segment = segment.as_ref();
        node = node
            .as_object_mut()
            .and_then(|object| object.get_mut(segment))
            .ok_or_else(|| not_found(path, segment))?;
    }
    Ok(node)
}

fn not_found<S: AsRef<str>>(path: &[S], segment: &str) -> StoreError {
    StoreError::StateNotFound {
        path: join_path(path),
        segment: segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_path_returns_root() {
        let root = json!({ "title": "Hello, world!" });
        let empty: [&str; 0] = [];
        assert_eq!(resolve_state(&empty, &root).unwrap(), &root);
    }

    #[test]
    fn test_nested_path() {
        let root = json!({ "a": { "b": { "value": 3 } } });
        let node = resolve_state(&["a", "b"], &root).unwrap();
        assert_eq!(node, &json!({ "value": 3 }));
    }

    #[test]
    fn test_missing_segment_is_reported() {
        let root = json!({ "a": {} });
        let err = resolve_state(&["a", "missing", "c"], &root).unwrap_err();
        match err {
            StoreError::StateNotFound { path, segment } => {
                assert_eq!(path, "a/missing/c");
                assert_eq!(segment, "missing");
            }
            other => unreachable!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_intermediate_fails() {
        let root = json!({ "a": 1 });
        assert!(resolve_state(&["a", "b"], &root).is_err());
    }

    #[test]
    fn test_resolve_mut_writes_through() {
        let mut root = json!({ "m": { "value": 0 } });
        let node = resolve_state_mut(&["m"], &mut root).unwrap();
        node["value"] = json!(1);
        assert_eq!(root["m"]["value"], json!(1));
    }
}
