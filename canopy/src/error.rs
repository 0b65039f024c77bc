//! Error types for the canopy library.
//!
//! This module provides the error taxonomy for all configuration-tree
//! operations, using `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::lifecycle::LifecyclePhase;

/// Result type alias for operations that may fail with a canopy error.
///
/// # Examples
///
/// ```
/// use canopy::{Error, Result};
///
/// fn example_operation() -> Result<u32> {
///     Ok(42)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the canopy library.
///
/// This enum encompasses all possible error conditions that can occur
/// while building, mutating, traversing, or reconstructing configuration
/// trees.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation was attempted before the owning tree finished
    /// initialization, or in a phase that does not permit it.
    #[error("configuration '{tree_type}' is in phase '{phase}': operation requires an initialised tree")]
    NotInitialised {
        /// The tree type of the configuration.
        tree_type: String,
        /// The phase the configuration was in.
        phase: LifecyclePhase,
    },

    /// A mutation was attempted on a finalised (read-only) tree.
    #[error("configuration '{tree_type}' is finalised and read-only")]
    ReadOnly {
        /// The tree type of the configuration.
        tree_type: String,
    },

    /// A read of an element that currently holds no value.
    #[error("element '{path}' holds no value")]
    AbsentValue {
        /// The full dotted path of the element.
        path: String,
    },

    /// An attempt to clear a non-optional element.
    #[error("element '{path}' is required and cannot be cleared")]
    RequiredValue {
        /// The full dotted path of the element.
        path: String,
    },

    /// A dotted-path segment that is not itself a sub-configuration.
    #[error("path '{path}' is not navigable at segment '{segment}': not a sub-configuration")]
    NotNavigable {
        /// The full original dotted path.
        path: String,
        /// The segment that failed to navigate.
        segment: String,
    },

    /// A named element (local or path segment) that is not registered.
    #[error("path '{path}' names no element at segment '{segment}'")]
    UnknownElement {
        /// The full original dotted path.
        path: String,
        /// The segment that did not resolve.
        segment: String,
    },

    /// An element was accessed as the wrong kind (item vs sub-configuration).
    #[error("element '{path}' kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// The full dotted path of the element.
        path: String,
        /// What the operation expected to find.
        expected: String,
        /// What the element actually is.
        found: String,
    },

    /// The owning tree's validation predicate rejected the current state.
    #[error("integrity violation in '{tree_type}': {reason}")]
    IntegrityViolation {
        /// The tree type of the configuration that failed validation.
        tree_type: String,
        /// The reason string produced by the predicate.
        reason: String,
    },

    /// A non-optional element finished initialization with neither an
    /// explicit value nor a default supplier.
    #[error("element '{name}' in '{tree_type}' has no value and no default")]
    MissingDefault {
        /// The tree type of the owning configuration.
        tree_type: String,
        /// The name of the element.
        name: String,
    },

    /// A duplicate element name was registered in a schema.
    #[error("duplicate element '{name}' in schema '{tree_type}'")]
    DuplicateElement {
        /// The tree type of the schema.
        tree_type: String,
        /// The duplicated element name.
        name: String,
    },

    /// A tree type was registered twice in a registry.
    #[error("tree type '{tree_type}' is already registered")]
    DuplicateTreeType {
        /// The duplicated tree type.
        tree_type: String,
    },

    /// A tree type was requested from a registry that does not know it.
    #[error("unknown tree type '{tree_type}'")]
    UnknownTreeType {
        /// The unknown tree type.
        tree_type: String,
    },

    /// The visitor call sequence was unbalanced or out of order.
    #[error("visitor protocol violation: {details}")]
    Protocol {
        /// Details about the violated call-sequence rule.
        details: String,
    },
}

impl Error {
    /// Re-wraps a path-carrying error raised inside a sub-configuration so
    /// that it reports the full original dotted path.
    ///
    /// The consumed `segment` is prefixed onto the path field of element
    /// errors; all other kinds pass through untouched.
    #[must_use]
    pub(crate) fn prefix_path(self, segment: &str) -> Self {
        match self {
            Self::AbsentValue { path } => Self::AbsentValue {
                path: format!("{segment}.{path}"),
            },
            Self::RequiredValue { path } => Self::RequiredValue {
                path: format!("{segment}.{path}"),
            },
            Self::NotNavigable { path, segment: bad } => Self::NotNavigable {
                path: format!("{segment}.{path}"),
                segment: bad,
            },
            Self::UnknownElement { path, segment: bad } => Self::UnknownElement {
                path: format!("{segment}.{path}"),
                segment: bad,
            },
            Self::KindMismatch {
                path,
                expected,
                found,
            } => Self::KindMismatch {
                path: format!("{segment}.{path}"),
                expected,
                found,
            },
            other => other,
        }
    }

    /// Check if error indicates an absent (unset) element value.
    ///
    /// # Examples
    ///
    /// ```
    /// use canopy::Error;
    ///
    /// let err = Error::AbsentValue { path: "size".to_string() };
    /// assert!(err.is_absent_value());
    /// ```
    #[must_use]
    pub fn is_absent_value(&self) -> bool {
        matches!(self, Self::AbsentValue { .. })
    }

    /// Check if error indicates a read-only violation.
    ///
    /// # Examples
    ///
    /// ```
    /// use canopy::Error;
    ///
    /// let err = Error::ReadOnly { tree_type: "server".to_string() };
    /// assert!(err.is_read_only());
    /// ```
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }

    /// Check if error indicates an integrity-check failure.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }
}
