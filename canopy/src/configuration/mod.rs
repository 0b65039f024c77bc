//! Configuration trees and their lifecycle state machine.
//!
//! A [`Configuration`] is an ordered, named collection of elements
//! instantiated from a [`Schema`]. It is constructed empty, populated by an
//! initializer closure, integrity-checked as a whole, and from then on
//! mutated either one element at a time (with an immediate whole-tree
//! check) or in bulk inside a reconfiguration transaction (with the check
//! deferred to transaction close and atomic rollback on failure).
//!
//! # Examples
//!
//! ```
//! use canopy::{SchemaBuilder, Value};
//!
//! let schema = SchemaBuilder::new("server")
//!     .required_item("name", "server name")
//!     .optional_item("banner", "greeting banner")
//!     .defaulted_item("port", "listen port", || Value::from(8080i64))
//!     .build()
//!     .unwrap();
//!
//! let mut config = schema
//!     .construct(|cfg| cfg.set("name", Value::from("edge")))
//!     .unwrap();
//!
//! assert_eq!(config.get("name").unwrap(), &Value::from("edge"));
//! assert_eq!(config.get("port").unwrap(), &Value::Integer(8080));
//! assert!(config.get("banner").unwrap_err().is_absent_value());
//!
//! config.set("port", Value::from(9090i64)).unwrap();
//! config.finalize().unwrap();
//! assert!(config.set("port", Value::from(1i64)).unwrap_err().is_read_only());
//! ```

pub mod path;
pub mod transaction;

use std::collections::HashMap;
use std::rc::Rc;

use crate::element::{DefaultState, Element, Payload, SubValue};
use crate::error::{Error, Result};
use crate::lifecycle::LifecyclePhase;
use crate::schema::{DefaultSource, ElementKind, Schema};
use crate::value::Value;

use self::path::split_path;

/// A boxed one-shot closure that populates a fresh configuration.
///
/// Produced by [`Configuration::initializer`] and consumed by
/// [`Configuration::initialize`] or [`Schema::construct`].
pub type Initializer = Box<dyn FnOnce(&mut Configuration) -> Result<()>>;

/// A live configuration tree node.
///
/// See the [module documentation](self) for the lifecycle model.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) schema: Schema,
    pub(crate) phase: LifecyclePhase,
    pub(crate) elements: HashMap<String, Element>,
    pub(crate) restore_point: HashMap<String, Payload>,
}

impl Configuration {
    pub(crate) fn from_schema(schema: Schema) -> Self {
        let mut elements = HashMap::new();
        for name in schema.element_names() {
            let Some(spec) = schema.spec(name) else {
                continue;
            };
            let payload = match spec.kind() {
                ElementKind::Item => Payload::Item(None),
                ElementKind::Sub(_) => Payload::Sub(SubValue::Absent),
            };
            let default = if spec.has_default() {
                DefaultState::Pending
            } else {
                DefaultState::Unavailable
            };
            elements.insert(name.clone(), Element::new(payload, default));
        }
        Self {
            schema,
            phase: LifecyclePhase::Uninitialised,
            elements,
            restore_point: HashMap::new(),
        }
    }

    /// The name of this tree's configuration type.
    #[must_use]
    pub fn tree_type(&self) -> &str {
        self.schema.tree_type()
    }

    /// The schema this tree was instantiated from.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Element names in declaration order.
    #[must_use]
    pub fn element_names(&self) -> &[String] {
        self.schema.element_names()
    }

    pub(crate) fn err_not_initialised(&self) -> Error {
        Error::NotInitialised {
            tree_type: self.tree_type().to_string(),
            phase: self.phase,
        }
    }

    pub(crate) fn err_read_only(&self) -> Error {
        Error::ReadOnly {
            tree_type: self.tree_type().to_string(),
        }
    }

    /// Runs the initializer and moves the tree to the initialised phase.
    ///
    /// The closure runs with the tree in the initialising phase, so every
    /// mutation is applied without an immediate integrity check. After the
    /// closure returns, pending per-element defaults are applied, required
    /// elements without a value or supplier raise `MissingDefault`, and the
    /// whole-tree integrity check runs once.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the tree is not uninitialised, any error
    /// raised by the initializer itself, `MissingDefault`, or
    /// `IntegrityViolation`.
    pub fn initialize<F>(&mut self, init: F) -> Result<()>
    where
        F: FnOnce(&mut Configuration) -> Result<()>,
    {
        if self.phase != LifecyclePhase::Uninitialised {
            return Err(Error::Protocol {
                details: format!(
                    "initialize on '{}' in phase '{}'",
                    self.tree_type(),
                    self.phase
                ),
            });
        }
        self.phase = LifecyclePhase::Initialising;
        log::debug!("initialising configuration '{}'", self.tree_type());
        init(self)?;
        self.apply_defaults()?;
        self.run_integrity()?;
        self.phase = LifecyclePhase::Initialised;
        log::debug!("configuration '{}' initialised", self.tree_type());
        Ok(())
    }

    /// Applies pending defaults to elements still absent after the
    /// initializer ran. A supplier runs at most once per instance.
    fn apply_defaults(&mut self) -> Result<()> {
        let schema = self.schema.clone();
        for name in schema.element_names() {
            let Some(spec) = schema.spec(name) else {
                continue;
            };
            let Some(element) = self.elements.get_mut(name) else {
                continue;
            };
            if element.payload.is_present() {
                continue;
            }
            if element.default == DefaultState::Pending {
                match spec.default_source() {
                    DefaultSource::Supplier(supplier) => {
                        element.payload = Payload::Item(Some(supplier()));
                    }
                    DefaultSource::ChildSchema => {
                        if let ElementKind::Sub(child_schema) = spec.kind() {
                            let child = child_schema.construct(|_| Ok(()))?;
                            element.payload = Payload::Sub(SubValue::Owned(Box::new(child)));
                        }
                    }
                    DefaultSource::None => {}
                }
                element.default = DefaultState::Spent;
                continue;
            }
            if !spec.is_optional() {
                return Err(Error::MissingDefault {
                    tree_type: schema.tree_type().to_string(),
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn run_integrity(&self) -> Result<()> {
        let schema = self.schema.clone();
        schema.run_check(self)
    }

    fn gate_mutation(&self) -> Result<()> {
        match self.phase {
            LifecyclePhase::Uninitialised => Err(self.err_not_initialised()),
            LifecyclePhase::Finalised => Err(self.err_read_only()),
            _ => Ok(()),
        }
    }

    /// Reads an item element's value through a dotted path.
    ///
    /// # Errors
    ///
    /// `NotInitialised` before initialization starts, `UnknownElement` /
    /// `NotNavigable` / `KindMismatch` for resolution failures, and
    /// `AbsentValue` for an optional element currently holding no value.
    /// Path errors always report the full original dotted path.
    pub fn get(&self, path: &str) -> Result<&Value> {
        if self.phase == LifecyclePhase::Uninitialised {
            return Err(self.err_not_initialised());
        }
        match split_path(path) {
            (name, None) => match &self.local_element(name)?.payload {
                Payload::Item(Some(value)) => Ok(value),
                Payload::Item(None) => Err(Error::AbsentValue {
                    path: name.to_string(),
                }),
                Payload::Sub(_) => Err(Error::KindMismatch {
                    path: name.to_string(),
                    expected: "item".to_string(),
                    found: "sub-configuration".to_string(),
                }),
            },
            (head, Some(rest)) => self
                .sub_child(head, path)?
                .get(rest)
                .map_err(|e| e.prefix_path(head)),
        }
    }

    /// Reads a sub-configuration element through a dotted path.
    ///
    /// # Errors
    ///
    /// Same failure kinds as [`get`](Self::get), with `KindMismatch` when
    /// the final segment is a plain item.
    pub fn get_sub(&self, path: &str) -> Result<&Configuration> {
        if self.phase == LifecyclePhase::Uninitialised {
            return Err(self.err_not_initialised());
        }
        match split_path(path) {
            (name, None) => match &self.local_element(name)?.payload {
                Payload::Sub(sub) => sub.as_config().ok_or_else(|| Error::AbsentValue {
                    path: name.to_string(),
                }),
                Payload::Item(_) => Err(Error::KindMismatch {
                    path: name.to_string(),
                    expected: "sub-configuration".to_string(),
                    found: "item".to_string(),
                }),
            },
            (head, Some(rest)) => self
                .sub_child(head, path)?
                .get_sub(rest)
                .map_err(|e| e.prefix_path(head)),
        }
    }

    /// Whether the element at the dotted path currently holds a value.
    ///
    /// # Errors
    ///
    /// Resolution failures as for [`get`](Self::get); an absent leaf is
    /// `Ok(false)`, not an error.
    pub fn is_present(&self, path: &str) -> Result<bool> {
        if self.phase == LifecyclePhase::Uninitialised {
            return Err(self.err_not_initialised());
        }
        match split_path(path) {
            (name, None) => Ok(self.local_element(name)?.is_present()),
            (head, Some(rest)) => self
                .sub_child(head, path)?
                .is_present(rest)
                .map_err(|e| e.prefix_path(head)),
        }
    }

    /// Sets an item element's value through a dotted path.
    ///
    /// Gating depends on the owning tree's phase: initialising and
    /// reconfiguring trees apply the value with checks suspended (the
    /// transaction records a first-touch restore point), an initialised
    /// tree applies the value and immediately runs the whole-tree integrity
    /// check, reverting this one element if it fails.
    ///
    /// # Errors
    ///
    /// `NotInitialised`, `ReadOnly`, resolution failures, `KindMismatch`
    /// for a sub-configuration element, or the re-raised
    /// `IntegrityViolation` from an immediate check.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        self.gate_mutation()?;
        match split_path(path) {
            (name, None) => self.set_local(name, value),
            (head, Some(rest)) => {
                self.record_restore(head);
                let sub = self.sub_child_mut(head, path)?;
                sub.set(rest, value).map_err(|e| e.prefix_path(head))
            }
        }
    }

    fn set_local(&mut self, name: &str, value: Value) -> Result<()> {
        if matches!(self.local_element(name)?.payload, Payload::Sub(_)) {
            return Err(Error::KindMismatch {
                path: name.to_string(),
                expected: "item".to_string(),
                found: "sub-configuration".to_string(),
            });
        }
        self.store_payload(name, Payload::Item(Some(value)))
    }

    /// Clears an element through a dotted path.
    ///
    /// Identical gating to [`set`](Self::set), but fails immediately with
    /// `RequiredValue` if the element is not optional.
    ///
    /// # Errors
    ///
    /// `RequiredValue` for a non-optional element, plus the same kinds as
    /// [`set`](Self::set).
    pub fn clear(&mut self, path: &str) -> Result<()> {
        self.gate_mutation()?;
        match split_path(path) {
            (name, None) => self.clear_local(name),
            (head, Some(rest)) => {
                self.record_restore(head);
                let sub = self.sub_child_mut(head, path)?;
                sub.clear(rest).map_err(|e| e.prefix_path(head))
            }
        }
    }

    fn clear_local(&mut self, name: &str) -> Result<()> {
        let schema = self.schema.clone();
        let spec = schema.spec(name).ok_or_else(|| Error::UnknownElement {
            path: name.to_string(),
            segment: name.to_string(),
        })?;
        if !spec.is_optional() {
            return Err(Error::RequiredValue {
                path: name.to_string(),
            });
        }
        let empty = match self.local_element(name)?.payload {
            Payload::Item(_) => Payload::Item(None),
            Payload::Sub(_) => Payload::Sub(SubValue::Absent),
        };
        self.store_payload(name, empty)
    }

    /// Assigns a sub-configuration through a dotted path.
    ///
    /// The tree is taken by value, so no external mutable alias into the
    /// owner's subtree can survive the assignment. A finalised incoming
    /// tree is rebuilt into a fresh mutable copy first, keeping the owner
    /// in control of its own subtree. The incoming tree must be
    /// integrity-assured (initialised or finalised) and of the declared
    /// child type.
    ///
    /// # Errors
    ///
    /// Gating and resolution failures as for [`set`](Self::set);
    /// `KindMismatch` for an item element or a tree-type mismatch;
    /// `NotInitialised` if the incoming tree is not integrity-assured.
    pub fn set_sub(&mut self, path: &str, value: Configuration) -> Result<()> {
        self.gate_mutation()?;
        match split_path(path) {
            (name, None) => self.set_sub_local(name, value),
            (head, Some(rest)) => {
                self.record_restore(head);
                let sub = self.sub_child_mut(head, path)?;
                sub.set_sub(rest, value).map_err(|e| e.prefix_path(head))
            }
        }
    }

    fn set_sub_local(&mut self, name: &str, value: Configuration) -> Result<()> {
        let schema = self.schema.clone();
        let spec = schema.spec(name).ok_or_else(|| Error::UnknownElement {
            path: name.to_string(),
            segment: name.to_string(),
        })?;
        let ElementKind::Sub(child_schema) = spec.kind() else {
            return Err(Error::KindMismatch {
                path: name.to_string(),
                expected: "sub-configuration".to_string(),
                found: "item".to_string(),
            });
        };
        if value.tree_type() != child_schema.tree_type() {
            return Err(Error::KindMismatch {
                path: name.to_string(),
                expected: child_schema.tree_type().to_string(),
                found: value.tree_type().to_string(),
            });
        }
        if !value.phase.is_integrity_assured() {
            return Err(value.err_not_initialised());
        }
        let mut incoming = if value.phase.is_finalised() {
            value.rebuild_unfrozen()?
        } else {
            value
        };
        // a sub assigned mid-transaction joins the suspension window
        if self.phase == LifecyclePhase::Reconfiguring {
            incoming.begin_reconfiguration()?;
        }
        self.store_payload(name, Payload::Sub(SubValue::Owned(Box::new(incoming))))
    }

    /// Applies a fully resolved payload to a local element under the
    /// current phase's checking regime.
    fn store_payload(&mut self, name: &str, payload: Payload) -> Result<()> {
        match self.phase {
            LifecyclePhase::Initialising => {
                let element = self.local_element_mut(name)?;
                element.payload = payload;
                element.spend_default();
                Ok(())
            }
            LifecyclePhase::Reconfiguring => {
                self.record_restore(name);
                let element = self.local_element_mut(name)?;
                element.payload = payload;
                element.spend_default();
                Ok(())
            }
            LifecyclePhase::Initialised => {
                let element = self.local_element_mut(name)?;
                let previous = std::mem::replace(&mut element.payload, payload);
                element.spend_default();
                if let Err(violation) = self.run_integrity() {
                    if let Some(element) = self.elements.get_mut(name) {
                        element.payload = previous;
                    }
                    return Err(violation);
                }
                Ok(())
            }
            // gate_mutation already excluded the remaining phases
            LifecyclePhase::Uninitialised => Err(self.err_not_initialised()),
            LifecyclePhase::Finalised => Err(self.err_read_only()),
        }
    }

    /// Records the pre-transaction payload of an element on its first
    /// touch within the active transaction. Later touches keep the
    /// original snapshot.
    pub(crate) fn record_restore(&mut self, name: &str) {
        if self.phase != LifecyclePhase::Reconfiguring {
            return;
        }
        if let Some(element) = self.elements.get(name) {
            if !self.restore_point.contains_key(name) {
                self.restore_point
                    .insert(name.to_string(), element.payload.clone());
            }
        }
    }

    /// Permanently freezes the tree read-only.
    ///
    /// Finalisation is recursive and converts owned subtrees into shared
    /// reference-counted handles, so finalised trees alias their subtrees
    /// cheaply instead of deep-copying them. Finalising an already
    /// finalised tree is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialised` unless the tree is initialised.
    pub fn finalize(&mut self) -> Result<()> {
        match self.phase {
            LifecyclePhase::Finalised => return Ok(()),
            LifecyclePhase::Initialised => {}
            _ => return Err(self.err_not_initialised()),
        }
        for element in self.elements.values_mut() {
            if let Payload::Sub(sub) = &mut element.payload {
                if matches!(sub, SubValue::Owned(_)) {
                    let taken = std::mem::replace(sub, SubValue::Absent);
                    if let SubValue::Owned(mut boxed) = taken {
                        boxed.finalize()?;
                        *sub = SubValue::Shared(Rc::from(boxed));
                    }
                }
            }
        }
        self.phase = LifecyclePhase::Finalised;
        log::debug!("configuration '{}' finalised", self.tree_type());
        Ok(())
    }

    /// Produces an independent copy of the tree.
    ///
    /// A finalised source yields a finalised copy whose subtrees are shared
    /// by reference (aliasing of immutable trees is the one permitted
    /// sharing). Any other integrity-assured source is deep-copied through
    /// re-initialization, running the same default and integrity path as a
    /// fresh tree.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialised` unless the tree is integrity-assured.
    pub fn duplicate(&self) -> Result<Configuration> {
        match self.phase {
            LifecyclePhase::Finalised => {
                let mut copy = Configuration::from_schema(self.schema.clone());
                for (name, element) in &self.elements {
                    let payload = match &element.payload {
                        Payload::Item(value) => Payload::Item(value.clone()),
                        Payload::Sub(SubValue::Shared(rc)) => {
                            Payload::Sub(SubValue::Shared(Rc::clone(rc)))
                        }
                        Payload::Sub(SubValue::Owned(boxed)) => {
                            Payload::Sub(SubValue::Owned(boxed.clone()))
                        }
                        Payload::Sub(SubValue::Absent) => Payload::Sub(SubValue::Absent),
                    };
                    copy.elements
                        .insert(name.clone(), Element::new(payload, element.default));
                }
                copy.phase = LifecyclePhase::Finalised;
                Ok(copy)
            }
            LifecyclePhase::Initialised => self.rebuild_unfrozen(),
            _ => Err(self.err_not_initialised()),
        }
    }

    /// Deep-copies the tree into a fresh initialised (never finalised)
    /// instance through the ordinary construction path.
    pub(crate) fn rebuild_unfrozen(&self) -> Result<Configuration> {
        self.schema.construct(|target| self.apply_onto(target))
    }

    /// Copies this tree's values onto a target of the same or linearly
    /// related shape.
    ///
    /// For every source element whose name the target also declares: a
    /// present item is set, a present subtree is deep-copied and assigned,
    /// and an absent source element clears the corresponding target
    /// element (the deliberate if-not-absent/otherwise combinator). Names
    /// the target does not declare are skipped, which is what restricts
    /// the operation to the linear ancestor relationship. For an already
    /// initialised target, run this inside a transaction so a mid-apply
    /// failure rolls back.
    ///
    /// # Errors
    ///
    /// `NotInitialised` if this tree is not integrity-assured, plus any
    /// error raised by the target's own `set`/`set_sub`/`clear` gating.
    pub fn apply_onto(&self, target: &mut Configuration) -> Result<()> {
        if !self.phase.is_integrity_assured() {
            return Err(self.err_not_initialised());
        }
        let schema = self.schema.clone();
        for name in schema.element_names() {
            let Some(element) = self.elements.get(name) else {
                continue;
            };
            if target.schema.spec(name).is_none() {
                continue;
            }
            match &element.payload {
                Payload::Item(Some(value)) => target.set(name, value.clone())?,
                Payload::Item(None) => target.clear(name)?,
                Payload::Sub(sub) => match sub.as_config() {
                    Some(child) => target.set_sub(name, child.rebuild_unfrozen()?)?,
                    None => target.clear(name)?,
                },
            }
        }
        Ok(())
    }

    /// Turns an integrity-assured tree into a one-shot initializer closure
    /// that applies its values onto a fresh target.
    ///
    /// This is the boundary contract consumed by configurable-object
    /// factories: a finalised configuration can always be replayed onto a
    /// new instance of the same or ancestor shape.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialised` unless the tree is integrity-assured.
    pub fn initializer(&self) -> Result<Initializer> {
        if !self.phase.is_integrity_assured() {
            return Err(self.err_not_initialised());
        }
        let snapshot = self.clone();
        Ok(Box::new(move |target: &mut Configuration| {
            snapshot.apply_onto(target)
        }))
    }

    fn local_element(&self, name: &str) -> Result<&Element> {
        self.elements.get(name).ok_or_else(|| Error::UnknownElement {
            path: name.to_string(),
            segment: name.to_string(),
        })
    }

    fn local_element_mut(&mut self, name: &str) -> Result<&mut Element> {
        self.elements
            .get_mut(name)
            .ok_or_else(|| Error::UnknownElement {
                path: name.to_string(),
                segment: name.to_string(),
            })
    }
}
