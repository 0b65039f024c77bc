//! Elements: the named slots of a configuration tree.
//!
//! An element is either a plain value item or a nested sub-configuration.
//! The element itself is a passive holder; all gating, restore-point
//! tracking, and integrity checking happen in the owning
//! [`Configuration`](crate::Configuration).

use std::rc::Rc;

use crate::configuration::Configuration;
use crate::value::Value;

/// Fixed descriptive metadata attached to an element by the registration
/// layer.
///
/// The core treats metadata as an opaque pass-through payload on visitor
/// calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementMetadata {
    description: String,
}

impl ElementMetadata {
    /// Creates metadata with the given human-readable description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// The human-readable description of the element.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The value slot of a sub-configuration element.
///
/// `Shared` only ever appears inside finalised trees: finalisation converts
/// owned subtrees into reference-counted handles, which is the one place
/// value aliasing is permitted (finalised trees are immutable, so aliasing
/// cannot race).
#[derive(Debug, Clone)]
pub enum SubValue {
    /// No sub-configuration is currently assigned.
    Absent,
    /// An exclusively owned, independently mutable subtree.
    Owned(Box<Configuration>),
    /// A finalised subtree shared by reference.
    Shared(Rc<Configuration>),
}

impl SubValue {
    /// Returns a reference to the contained configuration, if present.
    #[must_use]
    pub fn as_config(&self) -> Option<&Configuration> {
        match self {
            Self::Absent => None,
            Self::Owned(cfg) => Some(cfg),
            Self::Shared(cfg) => Some(cfg),
        }
    }

    /// Whether a sub-configuration is currently assigned.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// The tagged payload of an element: a leaf item or a nested subtree.
#[derive(Debug, Clone)]
pub enum Payload {
    /// A plain value item, possibly unset.
    Item(Option<Value>),
    /// A nested sub-configuration slot.
    Sub(SubValue),
}

impl Payload {
    /// Whether the element currently holds a value.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Item(value) => value.is_some(),
            Self::Sub(sub) => sub.is_present(),
        }
    }

    /// A short kind name for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::Sub(_) => "sub-configuration",
        }
    }
}

/// The single-shot state of an element's deferred default supplier.
///
/// The supplier closure itself lives in the schema; the element only tracks
/// whether it is still eligible to run. A pending default runs at most once
/// and the state then moves to `Spent`, so explicit sets and clears
/// permanently supersede it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultState {
    /// The schema declares a default that has not been applied yet.
    Pending,
    /// The default has run, or an explicit value superseded it.
    Spent,
    /// The schema declares no default for this element.
    Unavailable,
}

/// A single named slot in a configuration tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) payload: Payload,
    pub(crate) default: DefaultState,
}

impl Element {
    pub(crate) fn new(payload: Payload, default: DefaultState) -> Self {
        Self { payload, default }
    }

    /// The element's current payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether the element currently holds a value.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.payload.is_present()
    }

    /// The state of the element's deferred default.
    #[must_use]
    pub fn default_state(&self) -> DefaultState {
        self.default
    }

    /// Marks any pending default as superseded by an explicit touch.
    pub(crate) fn spend_default(&mut self) {
        if self.default == DefaultState::Pending {
            self.default = DefaultState::Spent;
        }
    }
}
