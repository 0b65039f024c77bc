//! Tree reconstruction from a visitor-protocol stream.
//!
//! The [`Reader`] is a [`Visitor`] that rebuilds a live configuration tree
//! from the call sequence any traversal source emits. It accumulates
//! deferred initializer steps per stack frame and instantiates each
//! sub-configuration the moment its bracket closes, so every subtree is
//! fully built and integrity-checked before its parent consumes it and the
//! parent's own check runs only over already-consistent children.
//!
//! # Examples
//!
//! ```
//! use canopy::{Reader, SchemaBuilder, SchemaRegistry, Value};
//!
//! let schema = SchemaBuilder::new("server")
//!     .required_item("name", "server name")
//!     .build()
//!     .unwrap();
//! let mut registry = SchemaRegistry::new();
//! registry.register(schema.clone()).unwrap();
//!
//! let original = schema
//!     .construct(|cfg| cfg.set("name", Value::from("edge")))
//!     .unwrap();
//!
//! let mut reader = Reader::new(&registry);
//! original.accept(&mut reader).unwrap();
//! let rebuilt = reader.finish().unwrap();
//! assert_eq!(rebuilt.get("name").unwrap(), &Value::from("edge"));
//! ```

use crate::configuration::Configuration;
use crate::element::ElementMetadata;
use crate::error::{Error, Result};
use crate::schema::registry::SchemaRegistry;
use crate::schema::{ElementKind, Schema};
use crate::value::Value;
use crate::visit::Visitor;

type Step = Box<dyn FnOnce(&mut Configuration) -> Result<()>>;

struct Frame {
    /// Slot name in the parent; `None` for the root frame.
    name: Option<String>,
    schema: Schema,
    steps: Vec<Step>,
}

impl Frame {
    fn instantiate(self) -> Result<Configuration> {
        let steps = self.steps;
        self.schema.construct(move |cfg| {
            for step in steps {
                step(cfg)?;
            }
            Ok(())
        })
    }
}

/// Rebuilds a configuration tree from visitation, strictly bottom-up.
///
/// The root tree type is resolved through the registry; nested tree types
/// are resolved through the parent schema's declared child shape and
/// cross-checked against the announced type.
pub struct Reader<'r> {
    registry: &'r SchemaRegistry,
    frames: Vec<Frame>,
    result: Option<Configuration>,
}

impl<'r> Reader<'r> {
    /// Creates a reader resolving root tree types through the registry.
    #[must_use]
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            frames: Vec::new(),
            result: None,
        }
    }

    /// Takes the reconstructed tree after a complete traversal.
    ///
    /// # Errors
    ///
    /// Returns `Protocol` if the traversal never ran to its final `end`.
    pub fn finish(self) -> Result<Configuration> {
        self.result.ok_or_else(|| Error::Protocol {
            details: "traversal did not complete".to_string(),
        })
    }

    fn current(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or_else(|| Error::Protocol {
            details: "call-back outside begin/end".to_string(),
        })
    }
}

impl Visitor for Reader<'_> {
    fn begin(&mut self, tree_type: &str) -> Result<()> {
        if self.result.is_some() || !self.frames.is_empty() {
            return Err(Error::Protocol {
                details: "begin on an already active reader".to_string(),
            });
        }
        let schema = self.registry.get(tree_type)?.clone();
        self.frames.push(Frame {
            name: None,
            schema,
            steps: Vec::new(),
        });
        Ok(())
    }

    fn item(&mut self, name: &str, value: &Value, _metadata: &ElementMetadata) -> Result<()> {
        let name = name.to_string();
        let value = value.clone();
        self.current()?
            .steps
            .push(Box::new(move |cfg| cfg.set(&name, value)));
        Ok(())
    }

    fn begin_sub_configuration(
        &mut self,
        name: &str,
        tree_type: &str,
        _metadata: &ElementMetadata,
    ) -> Result<()> {
        let frame = self.current()?;
        let spec = frame
            .schema
            .spec(name)
            .ok_or_else(|| Error::UnknownElement {
                path: name.to_string(),
                segment: name.to_string(),
            })?;
        let ElementKind::Sub(child) = spec.kind() else {
            return Err(Error::NotNavigable {
                path: name.to_string(),
                segment: name.to_string(),
            });
        };
        if child.tree_type() != tree_type {
            return Err(Error::KindMismatch {
                path: name.to_string(),
                expected: child.tree_type().to_string(),
                found: tree_type.to_string(),
            });
        }
        let child = child.clone();
        self.frames.push(Frame {
            name: Some(name.to_string()),
            schema: child,
            steps: Vec::new(),
        });
        Ok(())
    }

    fn end_sub_configuration(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| Error::Protocol {
            details: "end_sub_configuration without a frame".to_string(),
        })?;
        let Some(name) = frame.name.clone() else {
            // only the root frame has no slot name
            self.frames.push(frame);
            return Err(Error::Protocol {
                details: "end_sub_configuration at root level".to_string(),
            });
        };
        let built = frame.instantiate()?;
        self.current()?
            .steps
            .push(Box::new(move |cfg| cfg.set_sub(&name, built)));
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| Error::Protocol {
            details: "end without a frame".to_string(),
        })?;
        if frame.name.is_some() || !self.frames.is_empty() {
            return Err(Error::Protocol {
                details: "end with an unclosed sub-configuration".to_string(),
            });
        }
        self.result = Some(frame.instantiate()?);
        Ok(())
    }
}

/// Traverses a tree and rebuilds an independent copy through the registry.
///
/// This is the protocol-level clone: the rebuilt tree runs the full
/// initialization path, defaults and integrity checks included.
///
/// # Errors
///
/// Any traversal or reconstruction error, including `UnknownTreeType` if
/// the source's type is not registered.
pub fn reconstruct(registry: &SchemaRegistry, source: &Configuration) -> Result<Configuration> {
    let mut reader = Reader::new(registry);
    source.accept(&mut reader)?;
    reader.finish()
}
