//! Error types for the container and the service compiler

use thiserror::Error;

/// Errors raised while resolving services, at runtime or from a compiled container
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// Service ids must be non-empty
    #[error("Service id must be a non-empty string")]
    InvalidId,

    /// No binding, class or synthetic value exists for the id
    #[error("No entry found for id: {id}")]
    NotFound { id: String },

    /// Re-entrant resolution of an id on the current call chain
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// An OBJECT binding names a class that was never registered
    #[error("Class not found: {class}")]
    ClassNotFound { class: String },

    /// The class is anonymous, abstract or has no constructor
    #[error("Class {class} is not instantiable")]
    NotInstantiable { class: String },

    /// A constructor parameter has no argument, binding, default or null fallback
    #[error("Unresolvable parameter ${param} of {class}: {reason}")]
    UnresolvableParameter {
        class: String,
        param: String,
        reason: String,
    },

    /// Container parameter lookup failed
    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    /// A synthetic service was requested before a value was supplied
    #[error("Synthetic service {id} has not been set")]
    SyntheticNotSet { id: String },

    /// A value did not have the shape a constructor or caller expected
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A factory, constructor or extender reported a failure
    #[error("Failed to create service {id}: {reason}")]
    CreationFailed { id: String, reason: String },

    /// A lazy proxy outlived the container that created it
    #[error("Container has been dropped")]
    ContainerDropped,

    /// Container is locked and cannot be modified
    #[error("Container is locked - cannot register new services")]
    Locked,

    /// Internal error
    #[error("Internal container error: {0}")]
    Internal(String),
}

impl ContainerError {
    /// Create a NotFound error for an id
    #[inline]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a CyclicDependency error from the offending chain
    #[inline]
    pub fn circular(path: Vec<String>) -> Self {
        Self::CyclicDependency { path }
    }

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }
}

/// Errors raised by the service compiler. These never occur at runtime.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The binding names a class that was never registered
    #[error("Cannot compile {id}: class {class} not found")]
    ClassNotFound { id: String, class: String },

    /// The target class cannot be constructed
    #[error("Cannot compile {id}: class {class} is {reason}")]
    NotInstantiable {
        id: String,
        class: String,
        reason: &'static str,
    },

    /// A required constructor parameter cannot be satisfied
    #[error("Cannot compile {id}: unresolvable parameter ${param} of {class}: {reason}")]
    UnresolvableParameter {
        id: String,
        class: String,
        param: String,
        reason: String,
    },

    /// Autowired classes require each other
    #[error("Cannot compile {id}: circular autowiring {}", .path.join(" -> "))]
    CircularAutowire { id: String, path: Vec<String> },

    /// Two ids hash to the same generated method name
    #[error("Generated method {method} collides for {first} and {second}")]
    HashCollision {
        method: String,
        first: String,
        second: String,
    },

    /// A value that cannot be expressed as a literal was found where one is required
    #[error("Cannot compile {id}: {reason}")]
    UnsupportedValue { id: String, reason: String },

    /// Writing the generated source failed
    #[error("Failed to write compiled container: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_full_path() {
        let err = ContainerError::circular(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
    }

    #[test]
    fn test_not_found_message() {
        let err = ContainerError::not_found("mailer");
        assert_eq!(err.to_string(), "No entry found for id: mailer");
    }
}
