//! The explicit tree-type registry.
//!
//! Reconstruction from a visitor stream needs a way to turn a tree-type
//! name back into a schema. The registry is that factory table, resolved
//! explicitly instead of through runtime introspection.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// Maps tree-type names to their schemas.
///
/// # Examples
///
/// ```
/// use canopy::{SchemaBuilder, SchemaRegistry};
///
/// let schema = SchemaBuilder::new("server")
///     .optional_item("banner", "banner")
///     .build()
///     .unwrap();
///
/// let mut registry = SchemaRegistry::new();
/// registry.register(schema).unwrap();
/// assert!(registry.get("server").is_ok());
/// assert!(registry.get("ghost").is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema under its tree-type name.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTreeType` if the name is already registered.
    pub fn register(&mut self, schema: Schema) -> Result<()> {
        let tree_type = schema.tree_type().to_string();
        if self.schemas.contains_key(&tree_type) {
            return Err(Error::DuplicateTreeType { tree_type });
        }
        self.schemas.insert(tree_type, schema);
        Ok(())
    }

    /// Looks up the schema for a tree-type name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTreeType` if the name is not registered.
    pub fn get(&self, tree_type: &str) -> Result<&Schema> {
        self.schemas
            .get(tree_type)
            .ok_or_else(|| Error::UnknownTreeType {
                tree_type: tree_type.to_string(),
            })
    }

    /// Whether a tree type is registered.
    #[must_use]
    pub fn contains(&self, tree_type: &str) -> bool {
        self.schemas.contains_key(tree_type)
    }
}
