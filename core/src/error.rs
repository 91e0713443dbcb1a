//! Error types shared by the engine boundary and the proxy layer.
//!
//! Two families exist:
//!
//! - [`ConfigError`]: the configuration tree is malformed. Raised once, at build time,
//!   before any proxy is handed out.
//! - [`StoreError`]: a call into the engine failed. Proxies never retry or mask these;
//!   they reach the caller exactly as the engine produced them.

use std::fmt;
use thiserror::Error;

/// The kind of entry a configuration name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// A getter entry
    Getter,
    /// A mutation entry
    Mutation,
    /// An action entry
    Action,
    /// A nested module entry
    Module,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Getter => write!(f, "getter"),
            Self::Mutation => write!(f, "mutation"),
            Self::Action => write!(f, "action"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// Errors detected while validating a module configuration tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two entries of the same kind share a name within one mapping.
    ///
    /// Qualified keys are derived from names alone, so the second entry would be
    /// unreachable.
    #[error("Duplicate {kind} '{name}' in namespace '{namespace}'")]
    DuplicateHandler {
        /// Which mapping the duplicate was found in
        kind: HandlerKind,
        /// The repeated name
        name: String,
        /// Namespace of the module declaring it (empty for the root)
        namespace: String,
    },

    /// A name is empty or contains the namespace separator.
    #[error("Invalid {kind} name '{name}': names must be non-empty and must not contain '/'")]
    InvalidName {
        /// Which mapping the name was found in
        kind: HandlerKind,
        /// The offending name
        name: String,
    },

    /// A module with child modules declared a state that is not an object.
    ///
    /// Child module state is nested under the child's name, which needs an object.
    #[error("Module at '{path}' has child modules but its state is not an object")]
    NonObjectState {
        /// Module path (`a/b`, empty for the root)
        path: String,
    },
}

/// Errors produced by store engine operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No mutation is registered under the qualified key.
    #[error("Unknown mutation type: {0}")]
    UnknownMutation(String),

    /// No action is registered under the qualified key.
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    /// No getter is registered under the qualified key.
    #[error("Unknown getter: {0}")]
    UnknownGetter(String),

    /// A state path does not exist in the state tree.
    ///
    /// This means the declared module tree and the actual state shape disagree.
    #[error("State path '{path}' not found: missing segment '{segment}'")]
    StateNotFound {
        /// The full path being resolved
        path: String,
        /// The first segment that could not be found
        segment: String,
    },

    /// No module is registered at the given path.
    #[error("Module not found at path '{0}'")]
    ModuleNotFound(String),

    /// A module is already registered at the given path.
    #[error("Module already registered at path '{0}'")]
    ModuleExists(String),

    /// An action handler failed.
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// A mutation handler failed.
    #[error("Mutation failed: {0}")]
    MutationFailed(String),

    /// A payload, state or result could not be converted to or from its typed form.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration handed to the engine was rejected.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
