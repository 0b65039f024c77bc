//! Schemas: the explicit, declaration-ordered shape of a configuration type.
//!
//! A schema is built once per configurable type with explicit registration
//! calls (replacing host-language property hooks) and then instantiated any
//! number of times into live [`Configuration`](crate::Configuration) trees.
//!
//! # Examples
//!
//! ```
//! use canopy::{Schema, SchemaBuilder, Value};
//!
//! let schema = SchemaBuilder::new("server")
//!     .required_item("name", "server name")
//!     .optional_item("banner", "greeting banner")
//!     .defaulted_item("port", "listen port", || Value::from(8080i64))
//!     .build()
//!     .unwrap();
//!
//! let config = schema
//!     .construct(|cfg| cfg.set("name", Value::from("edge")))
//!     .unwrap();
//! assert_eq!(config.get("port").unwrap(), &Value::Integer(8080));
//! ```

pub mod registry;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::configuration::Configuration;
use crate::element::ElementMetadata;
use crate::error::{Error, Result};
use crate::value::Value;

/// A whole-tree validation predicate.
///
/// Returns `Ok(())` when the tree is consistent, or a descriptive failure
/// reason. It runs at defined checkpoints (end of initialization, after a
/// single mutation outside a transaction, and at transaction close), never
/// per-field.
pub type IntegrityCheck = Rc<dyn Fn(&Configuration) -> std::result::Result<(), String>>;

/// A zero-argument supplier producing an item element's default value.
pub type DefaultSupplier = Rc<dyn Fn() -> Value>;

/// What kind of slot an element declares.
#[derive(Clone)]
pub enum ElementKind {
    /// A plain value item.
    Item,
    /// A nested sub-configuration of the given shape.
    Sub(Schema),
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => write!(f, "Item"),
            Self::Sub(schema) => write!(f, "Sub({})", schema.tree_type()),
        }
    }
}

/// Where an element's default value comes from, if anywhere.
#[derive(Clone)]
pub(crate) enum DefaultSource {
    None,
    Supplier(DefaultSupplier),
    /// Sub elements default to an instance of their child schema built from
    /// that schema's own defaults.
    ChildSchema,
}

/// The declared shape of one element.
#[derive(Clone)]
pub struct ElementSpec {
    kind: ElementKind,
    optional: bool,
    default: DefaultSource,
    metadata: ElementMetadata,
}

impl ElementSpec {
    /// The element's kind (item or sub-configuration).
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Whether the element may legitimately hold no value.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The element's descriptive metadata.
    #[must_use]
    pub fn metadata(&self) -> &ElementMetadata {
        &self.metadata
    }

    pub(crate) fn has_default(&self) -> bool {
        !matches!(self.default, DefaultSource::None)
    }

    pub(crate) fn default_source(&self) -> &DefaultSource {
        &self.default
    }
}

impl fmt::Debug for ElementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementSpec")
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("has_default", &self.has_default())
            .finish_non_exhaustive()
    }
}

struct SchemaInner {
    tree_type: String,
    order: Vec<String>,
    specs: HashMap<String, ElementSpec>,
    check: Option<IntegrityCheck>,
}

/// The immutable, cheaply cloneable shape of a configuration type.
///
/// Cloning a schema clones a reference-counted handle, so schemas can be
/// embedded in other schemas and registries without duplication.
#[derive(Clone)]
pub struct Schema {
    inner: Rc<SchemaInner>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("tree_type", &self.inner.tree_type)
            .field("elements", &self.inner.order)
            .finish_non_exhaustive()
    }
}

impl Schema {
    /// The name of the configuration type this schema describes.
    #[must_use]
    pub fn tree_type(&self) -> &str {
        &self.inner.tree_type
    }

    /// Element names in declaration order. This is the definitive iteration
    /// and serialization order of the tree.
    #[must_use]
    pub fn element_names(&self) -> &[String] {
        &self.inner.order
    }

    /// Looks up the declared spec for a local element name.
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&ElementSpec> {
        self.inner.specs.get(name)
    }

    /// Instantiates an empty, uninitialised tree of this shape.
    ///
    /// Every element starts absent with its default supplier pending; the
    /// tree must be populated through
    /// [`Configuration::initialize`](crate::Configuration::initialize)
    /// before it can be read.
    #[must_use]
    pub fn instantiate(&self) -> Configuration {
        Configuration::from_schema(self.clone())
    }

    /// Instantiates and initializes a tree in one step.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the initializer, a `MissingDefault` for a
    /// required element left without a value or supplier, or an
    /// `IntegrityViolation` if the completed tree fails its check.
    pub fn construct<F>(&self, init: F) -> Result<Configuration>
    where
        F: FnOnce(&mut Configuration) -> Result<()>,
    {
        let mut config = self.instantiate();
        config.initialize(init)?;
        Ok(config)
    }

    /// Runs this schema's integrity check against a tree.
    ///
    /// Absence of a check means "always ok".
    pub(crate) fn run_check(&self, config: &Configuration) -> Result<()> {
        if let Some(check) = &self.inner.check {
            let check = Rc::clone(check);
            check(config).map_err(|reason| Error::IntegrityViolation {
                tree_type: self.inner.tree_type.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

/// Builder for [`Schema`] values.
///
/// Registration is append-only and performed once per name; a duplicate
/// name fails at build time.
pub struct SchemaBuilder {
    tree_type: String,
    order: Vec<String>,
    specs: HashMap<String, ElementSpec>,
    check: Option<IntegrityCheck>,
    duplicate: Option<String>,
}

impl SchemaBuilder {
    /// Starts a schema for the named configuration type.
    #[must_use]
    pub fn new(tree_type: impl Into<String>) -> Self {
        Self {
            tree_type: tree_type.into(),
            order: Vec::new(),
            specs: HashMap::new(),
            check: None,
            duplicate: None,
        }
    }

    fn register(mut self, name: &str, spec: ElementSpec) -> Self {
        if self.specs.contains_key(name) {
            if self.duplicate.is_none() {
                self.duplicate = Some(name.to_string());
            }
            return self;
        }
        self.order.push(name.to_string());
        self.specs.insert(name.to_string(), spec);
        self
    }

    /// Declares a required value item.
    #[must_use]
    pub fn required_item(self, name: &str, description: &str) -> Self {
        self.register(
            name,
            ElementSpec {
                kind: ElementKind::Item,
                optional: false,
                default: DefaultSource::None,
                metadata: ElementMetadata::new(description),
            },
        )
    }

    /// Declares an optional value item.
    #[must_use]
    pub fn optional_item(self, name: &str, description: &str) -> Self {
        self.register(
            name,
            ElementSpec {
                kind: ElementKind::Item,
                optional: true,
                default: DefaultSource::None,
                metadata: ElementMetadata::new(description),
            },
        )
    }

    /// Declares a required value item with a deferred default supplier.
    ///
    /// The supplier runs at most once per tree instance, the first time the
    /// element finishes initialization without an explicit value.
    #[must_use]
    pub fn defaulted_item<F>(self, name: &str, description: &str, supplier: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        self.register(
            name,
            ElementSpec {
                kind: ElementKind::Item,
                optional: false,
                default: DefaultSource::Supplier(Rc::new(supplier)),
                metadata: ElementMetadata::new(description),
            },
        )
    }

    /// Declares a required nested sub-configuration.
    #[must_use]
    pub fn required_sub(self, name: &str, child: Schema, description: &str) -> Self {
        self.register(
            name,
            ElementSpec {
                kind: ElementKind::Sub(child),
                optional: false,
                default: DefaultSource::None,
                metadata: ElementMetadata::new(description),
            },
        )
    }

    /// Declares an optional nested sub-configuration.
    #[must_use]
    pub fn optional_sub(self, name: &str, child: Schema, description: &str) -> Self {
        self.register(
            name,
            ElementSpec {
                kind: ElementKind::Sub(child),
                optional: true,
                default: DefaultSource::None,
                metadata: ElementMetadata::new(description),
            },
        )
    }

    /// Declares a required nested sub-configuration that defaults to an
    /// instance built purely from the child schema's own defaults.
    #[must_use]
    pub fn defaulted_sub(self, name: &str, child: Schema, description: &str) -> Self {
        self.register(
            name,
            ElementSpec {
                kind: ElementKind::Sub(child),
                optional: false,
                default: DefaultSource::ChildSchema,
                metadata: ElementMetadata::new(description),
            },
        )
    }

    /// Installs the whole-tree integrity check.
    ///
    /// The predicate returns `Ok(())` or a descriptive failure reason.
    #[must_use]
    pub fn integrity_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Configuration) -> std::result::Result<(), String> + 'static,
    {
        self.check = Some(Rc::new(check));
        self
    }

    /// Finishes the schema.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateElement` if any element name was registered twice.
    pub fn build(self) -> Result<Schema> {
        if let Some(name) = self.duplicate {
            return Err(Error::DuplicateElement {
                tree_type: self.tree_type,
                name,
            });
        }
        Ok(Schema {
            inner: Rc::new(SchemaInner {
                tree_type: self.tree_type,
                order: self.order,
                specs: self.specs,
                check: self.check,
            }),
        })
    }
}
