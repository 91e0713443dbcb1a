//! Key qualification and namespace derivation.
//!
//! Every getter, mutation and action is addressed in the engine by a *qualified key*:
//! the handler's configured name prefixed with the namespace of the module that
//! declares it.
//!
//! ```
//! use typed_store_core::namespace::{child_namespace, qualify};
//!
//! assert_eq!(qualify("setTitle", ""), "setTitle");
//! assert_eq!(qualify("bump", "cart/items"), "cart/items/bump");
//!
//! // Namespaced modules append their name, others pass the parent's through
//! assert_eq!(child_namespace("cart", "items", true), "cart/items");
//! assert_eq!(child_namespace("cart", "items", false), "cart");
//! ```

/// Separator between namespace segments and between a namespace and a handler name.
pub const SEPARATOR: char = '/';

/// Derive the engine key for `name` declared in `namespace`.
///
/// Returns `namespace/name` when the namespace is non-empty, otherwise `name`.
/// No escaping and no collision detection is performed.
#[must_use]
pub fn qualify(name: &str, namespace: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}{SEPARATOR}{name}")
    }
}

/// Namespace of a child module declared under `parent`.
///
/// A namespaced module contributes its own name as a new segment. A module that is not
/// namespaced contributes nothing: its members share the parent's namespace.
#[must_use]
pub fn child_namespace(parent: &str, module_name: &str, namespaced: bool) -> String {
    if namespaced {
        qualify(module_name, parent)
    } else {
        parent.to_string()
    }
}

/// Split a namespace into its non-empty segments.
#[must_use]
pub fn split_path(namespace: &str) -> Vec<&str> {
    namespace
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Join path segments into a display string (`a/b/c`).
#[must_use]
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `name` can be used as a handler or module name.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_qualify_root() {
        assert_eq!(qualify("setTitle", ""), "setTitle");
    }

    #[test]
    fn test_qualify_nested() {
        assert_eq!(qualify("bump", "m"), "m/bump");
        assert_eq!(qualify("bump", "a/b"), "a/b/bump");
    }

    #[test]
    fn test_child_namespace_pass_through() {
        assert_eq!(child_namespace("", "m", false), "");
        assert_eq!(child_namespace("", "m", true), "m");
        assert_eq!(child_namespace("a", "b", true), "a/b");
    }

    #[test]
    fn test_split_path() {
        assert!(split_path("").is_empty());
        assert_eq!(split_path("a/b"), vec!["a", "b"]);
        assert_eq!(split_path("a//b/"), vec!["a", "b"]);
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("setTitle"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a/b"));
    }

    proptest! {
        #[test]
        fn prop_qualify_prefixes_non_empty_namespace(
            name in "[a-zA-Z][a-zA-Z0-9_]{0,12}",
            namespace in "[a-z]{1,6}(/[a-z]{1,6}){0,3}",
        ) {
            prop_assert_eq!(qualify(&name, &namespace), format!("{namespace}/{name}"));
        }

        #[test]
        fn prop_qualify_empty_namespace_is_identity(name in "[a-zA-Z][a-zA-Z0-9_]{0,12}") {
            prop_assert_eq!(qualify(&name, ""), name);
        }

        #[test]
        fn prop_namespaced_chain_splits_back_into_modules(
            modules in proptest::collection::vec("[a-z]{1,6}", 0..5),
        ) {
            let namespace = modules
                .iter()
                .fold(String::new(), |ns, module| child_namespace(&ns, module, true));
            let segments: Vec<String> = split_path(&namespace)
                .into_iter()
                .map(str::to_string)
                .collect();
            prop_assert_eq!(segments, modules);
        }
    }
}
