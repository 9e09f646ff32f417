//! Error types for the Arbor core engine.
//!
//! Lookup failures and stale-entry access are reported as explicit values.
//! Run failures are *not* errors: they travel as negative [`RunResult`]s and
//! are cached like any other outcome.
//!
//! [`RunResult`]: crate::RunResult

use thiserror::Error;

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised by the [`ServiceRegistry`](crate::ServiceRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No constructor was ever registered under this identity.
    #[error("unknown service identity '{identity}'")]
    UnknownService {
        /// The identity that was looked up.
        identity: String,
    },
}

impl RegistryError {
    /// Creates an unknown-service error.
    pub fn unknown(identity: impl Into<String>) -> Self {
        Self::UnknownService {
            identity: identity.into(),
        }
    }
}

// =============================================================================
// Stack Errors
// =============================================================================

/// Errors raised by a [`Manager`](crate::Manager).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// The stack holds no entry for this identity.
    ///
    /// Returned instead of synthesising a service-less entry.
    #[error("no entry for service '{identity}' in execution stack")]
    UnknownEntry {
        /// The identity that was addressed.
        identity: String,
    },
}

impl StackError {
    /// Creates an unknown-entry error.
    pub fn unknown(identity: impl Into<String>) -> Self {
        Self::UnknownEntry {
            identity: identity.into(),
        }
    }
}

// =============================================================================
// Service Errors
// =============================================================================

/// Errors a [`Behavior`](crate::Behavior) hook may report.
///
/// The lifecycle driver logs these and carries on; they never escape
/// `install` or `uninstall`.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Assembling children failed on a registry lookup.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A stack operation addressed a missing entry.
    #[error(transparent)]
    Stack(#[from] StackError),

    /// Service-specific failure.
    #[error("{0}")]
    Custom(String),
}

impl ServiceError {
    /// Creates a custom service error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for execution stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Result type for behavior hooks.
pub type ServiceResult<T = ()> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RegistryError::unknown("NoSuchService");
        assert_eq!(err.to_string(), "unknown service identity 'NoSuchService'");

        let err = StackError::unknown("a::B");
        assert_eq!(
            err.to_string(),
            "no entry for service 'a::B' in execution stack"
        );

        let err: ServiceError = RegistryError::unknown("x").into();
        assert!(matches!(err, ServiceError::Registry(_)));
        assert_eq!(err.to_string(), "unknown service identity 'x'");
    }
}
