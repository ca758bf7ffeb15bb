//! Error types for the container

use thiserror::Error;

/// Broad classification of a [`DiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A definition or an argument collection is structurally invalid
    Configuration,
    /// The identifier cannot be turned into an instance
    NotInstantiable,
    /// A required untyped parameter has no value
    MissingDependency,
    /// A typed parameter has no compatible value
    InvocationType,
    /// A constructor, factory or callable body failed
    Creation,
}

/// Errors that can occur while registering or resolving
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// A definition, argument list or property map is malformed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A property override names a property the class does not expose
    #[error("Setting unknown property: {class}::{property}")]
    UnknownProperty { class: String, property: String },

    /// A callable references a method or function nobody described
    #[error("Unknown callable: {name}")]
    UnknownCallable { name: String },

    /// The identifier is an interface, an undescribed type, or its own
    /// dependencies cannot be built
    #[error("Failed to instantiate component or class \"{id}\": {reason}")]
    NotInstantiable { id: String, reason: String },

    /// The identifier is already being built further up the call path
    #[error("Circular dependency detected while resolving \"{id}\" (path: {})", chain.join(" -> "))]
    CircularDependency { id: String, chain: Vec<String> },

    /// A required, untyped parameter without default received no value
    #[error("Missing required parameter \"{parameter}\" when instantiating \"{target}\"")]
    MissingDependency { parameter: String, target: String },

    /// A typed parameter received, or could only be given, an incompatible value
    #[error("Argument \"{parameter}\" of \"{target}\" must be of type {expected}, {given} given")]
    InvocationType {
        parameter: String,
        target: String,
        expected: String,
        given: String,
    },

    /// A constructor, factory or function body reported a failure
    #[error("Failed to create {target}: {reason}")]
    CreationFailed { target: String, reason: String },

    /// A resolved instance is not of the requested Rust type
    #[error("Instance of \"{class}\" resolved for \"{id}\" is not a {expected}")]
    Downcast {
        id: String,
        class: String,
        expected: &'static str,
    },
}

impl DiError {
    /// Create an InvalidConfig error
    #[inline]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a NotInstantiable error
    #[inline]
    pub fn not_instantiable(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotInstantiable {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingDependency error
    #[inline]
    pub fn missing(parameter: impl Into<String>, target: impl Into<String>) -> Self {
        Self::MissingDependency {
            parameter: parameter.into(),
            target: target.into(),
        }
    }

    /// The kind of failure this error represents
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig { .. }
            | Self::UnknownProperty { .. }
            | Self::UnknownCallable { .. }
            | Self::Downcast { .. } => ErrorKind::Configuration,
            Self::NotInstantiable { .. } | Self::CircularDependency { .. } => {
                ErrorKind::NotInstantiable
            }
            Self::MissingDependency { .. } => ErrorKind::MissingDependency,
            Self::InvocationType { .. } => ErrorKind::InvocationType,
            Self::CreationFailed { .. } => ErrorKind::Creation,
        }
    }

    #[inline]
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    #[inline]
    pub fn is_not_instantiable(&self) -> bool {
        self.kind() == ErrorKind::NotInstantiable
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, DiError>;
