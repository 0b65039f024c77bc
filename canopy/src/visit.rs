//! The push-based visitor protocol and depth-first tree traversal.
//!
//! The protocol is the sole serialization-agnostic contract between a
//! configuration tree and its consumers: serializers, cloners, and the
//! [`Reader`](crate::Reader) all implement [`Visitor`] and are driven by
//! [`Configuration::accept`]. The call sequence is
//! `begin → (item | begin_sub_configuration … end_sub_configuration)* → end`,
//! in declaration order, with absent elements skipped entirely.

use crate::configuration::Configuration;
use crate::element::{ElementMetadata, Payload};
use crate::error::Result;
use crate::value::Value;

/// A consumer of the visitor protocol.
///
/// Every call-back may fail; traversal stops at the first error and
/// propagates it to the caller of [`Configuration::accept`].
pub trait Visitor {
    /// Opens the traversal of a root tree of the given type.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the traversal.
    fn begin(&mut self, tree_type: &str) -> Result<()>;

    /// Reports one present item element.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the traversal.
    fn item(&mut self, name: &str, value: &Value, metadata: &ElementMetadata) -> Result<()>;

    /// Opens one present sub-configuration element. The elements that
    /// follow, up to the matching [`end_sub_configuration`](Self::end_sub_configuration),
    /// belong to the nested tree.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the traversal.
    fn begin_sub_configuration(
        &mut self,
        name: &str,
        tree_type: &str,
        metadata: &ElementMetadata,
    ) -> Result<()>;

    /// Closes the most recently opened sub-configuration element.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the traversal.
    fn end_sub_configuration(&mut self) -> Result<()>;

    /// Closes the traversal of the root tree.
    ///
    /// # Errors
    ///
    /// Implementation-defined; aborts the traversal.
    fn end(&mut self) -> Result<()>;
}

impl Configuration {
    /// Drives a depth-first traversal of this tree through a visitor.
    ///
    /// Only the root is wrapped in a `begin`/`end` pair; nested trees are
    /// bracketed by `begin_sub_configuration`/`end_sub_configuration`
    /// only, so the element walk is shared between root and nested
    /// levels. Absent elements emit nothing: optional-and-unset is
    /// invisible to every consumer of the protocol.
    ///
    /// # Errors
    ///
    /// `NotInitialised` unless the tree is integrity-assured, or the
    /// first error returned by a visitor call-back.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        if !self.phase.is_integrity_assured() {
            return Err(self.err_not_initialised());
        }
        visitor.begin(self.tree_type())?;
        self.visit_elements(visitor)?;
        visitor.end()
    }

    fn visit_elements<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        for name in self.schema.element_names() {
            let Some(element) = self.elements.get(name) else {
                continue;
            };
            let Some(spec) = self.schema.spec(name) else {
                continue;
            };
            match &element.payload {
                Payload::Item(Some(value)) => visitor.item(name, value, spec.metadata())?,
                Payload::Item(None) => {}
                Payload::Sub(sub) => {
                    if let Some(child) = sub.as_config() {
                        visitor.begin_sub_configuration(
                            name,
                            child.tree_type(),
                            spec.metadata(),
                        )?;
                        child.visit_elements(visitor)?;
                        visitor.end_sub_configuration()?;
                    }
                }
            }
        }
        Ok(())
    }
}
