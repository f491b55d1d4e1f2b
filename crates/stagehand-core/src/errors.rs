//! Error taxonomy for region navigation
//!
//! Navigation failures are surfaced to the awaiting caller and never retried.
//! Condition failures inside an initial flow are not part of this taxonomy:
//! they are recovered locally and only logged.

use std::time::Duration;

/// Errors produced by region waits, view resolution and navigation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// The named region was not registered within the allotted time
    #[error("Region '{region}' was not registered within {timeout:?}")]
    RegionTimeout {
        /// Region the caller was waiting for
        region: String,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A navigation referenced a view key with no registration
    #[error("View '{view_key}' is not registered")]
    ViewNotRegistered {
        /// The unknown view key
        view_key: String,
    },

    /// A typed navigation could not resolve its view-model
    #[error("View-model '{type_name}' could not be resolved")]
    ViewModelNotFound {
        /// Rust type name of the requested view-model
        type_name: &'static str,
    },

    /// A background task outlived the navigation manager that scheduled it
    #[error("Navigation manager is no longer available")]
    NavigatorUnavailable,

    /// An empty region name or view key was passed to an operation
    #[error("Invalid {what}: must not be empty")]
    InvalidName {
        /// Which argument was empty
        what: &'static str,
    },
}

impl NavigationError {
    /// Create a region timeout error
    pub fn region_timeout(region: impl Into<String>, timeout: Duration) -> Self {
        Self::RegionTimeout {
            region: region.into(),
            timeout,
        }
    }

    /// Create a view-not-registered error
    pub fn view_not_registered(view_key: impl Into<String>) -> Self {
        Self::ViewNotRegistered {
            view_key: view_key.into(),
        }
    }

    /// Create a view-model-not-found error for `T`
    pub fn view_model_not_found<T: ?Sized>() -> Self {
        Self::ViewModelNotFound {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// True for failures caused by a region that never appeared.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RegionTimeout { .. })
    }
}

/// Reject empty region names and view keys before they reach the tables.
pub fn ensure_name(value: &str, what: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(NavigationError::InvalidName { what });
    }
    Ok(())
}

/// Errors produced while loading or validating region policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The policy document is not valid TOML or does not match the schema
    #[error("Invalid policy document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the policy model rejects
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create a validation error for `field`
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Standard Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavigationError>;
