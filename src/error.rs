//! # Criteria Error Types
//!
//! Structured error handling for criteria compilation using thiserror.
//!
//! Most resolution problems never surface here: a condition whose target cannot be
//! resolved is simply omitted. Errors are reserved for role violations, strict-mode
//! lookup failures, alias collisions and placeholder rewriting.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("Unresolved property: {entity}.{property}")]
    UnresolvedProperty { entity: String, property: String },

    #[error("Unsupported operation: {operation} is not allowed on a {role} criteria")]
    UnsupportedOperation { operation: String, role: String },

    #[error("Alias collision: alias '{alias}' is used by more than one criteria in the same tree")]
    AliasCollision { alias: String },

    #[error("Detached criteria: {entity} was built on a different context")]
    DetachedContext { entity: String },

    #[error("Unknown placeholder: {token} has no bound value")]
    UnknownPlaceholder { token: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CriteriaError {
    pub fn unresolved(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnresolvedProperty {
            entity: entity.into(),
            property: property.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>, role: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            role: role.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CriteriaError>;
