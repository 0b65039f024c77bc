//! Lifecycle phases for configuration trees.
//!
//! Every configuration tree moves through a small state machine: it is
//! constructed empty, populated by an initializer, integrity-checked once,
//! then optionally reconfigured in transactions or frozen read-only.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle phase of a configuration tree.
///
/// Transitions:
///
/// ```text
/// Uninitialised -> Initialising -> Initialised <-> Reconfiguring
///                                  Initialised  -> Finalised (terminal)
/// ```
///
/// # Examples
///
/// ```
/// use canopy::LifecyclePhase;
///
/// assert!(LifecyclePhase::Initialising.is_writable());
/// assert!(LifecyclePhase::Finalised.is_integrity_assured());
/// assert!(!LifecyclePhase::Finalised.is_writable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    /// Constructed but not yet populated; every element is absent.
    Uninitialised,
    /// The initializer is running; mutations are unchecked.
    Initialising,
    /// Fully populated and integrity-checked.
    Initialised,
    /// Inside a reconfiguration transaction; integrity checks are suspended
    /// until the transaction closes.
    Reconfiguring,
    /// Permanently read-only. Terminal state.
    Finalised,
}

impl LifecyclePhase {
    /// Whether value mutations are currently applied without an immediate
    /// integrity check.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Initialising | Self::Reconfiguring)
    }

    /// Whether a reconfiguration transaction may be entered (or is already
    /// active).
    #[must_use]
    pub const fn is_reconfigurable(self) -> bool {
        matches!(self, Self::Initialised | Self::Reconfiguring)
    }

    /// Whether the tree has passed its most recent integrity checkpoint.
    #[must_use]
    pub const fn is_integrity_assured(self) -> bool {
        matches!(self, Self::Initialised | Self::Finalised)
    }

    /// Whether the tree is permanently read-only.
    #[must_use]
    pub const fn is_finalised(self) -> bool {
        matches!(self, Self::Finalised)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialised => write!(f, "uninitialised"),
            Self::Initialising => write!(f, "initialising"),
            Self::Initialised => write!(f, "initialised"),
            Self::Reconfiguring => write!(f, "reconfiguring"),
            Self::Finalised => write!(f, "finalised"),
        }
    }
}
