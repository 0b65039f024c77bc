//! Canopy is a structured configuration framework built around tree-shaped
//! configuration objects with an explicit lifecycle.
//!
//! A configuration tree is declared once through a [`SchemaBuilder`],
//! instantiated empty, populated by an initializer closure, and validated
//! as a whole by a pluggable integrity check. From then on it can be
//! mutated one element at a time (every mutation immediately re-checked),
//! edited in bulk inside a reconfiguration transaction (checks suspended
//! until close, atomic rollback on failure), or frozen permanently
//! read-only with [`Configuration::finalize`].
//!
//! Trees are traversed through a push-based visitor protocol
//! ([`Visitor`]) and rebuilt from such traversals by the [`Reader`],
//! which is how serialization layers and protocol-level cloning plug in
//! without knowing anything about tree shapes.
//!
//! # Examples
//!
//! ```
//! use canopy::{SchemaBuilder, Value};
//!
//! let schema = SchemaBuilder::new("server")
//!     .required_item("name", "server name")
//!     .defaulted_item("port", "listen port", || Value::from(8080i64))
//!     .integrity_check(|cfg| {
//!         match cfg.get("port").ok().and_then(Value::as_integer) {
//!             Some(p) if p >= 1024 => Ok(()),
//!             _ => Err("port below 1024".to_string()),
//!         }
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut config = schema
//!     .construct(|cfg| cfg.set("name", Value::from("edge")))
//!     .unwrap();
//!
//! // bulk edit with deferred validation and atomic rollback
//! let result = config.reconfigure(|cfg| {
//!     cfg.set("port", Value::from(80i64))
//! });
//! assert!(result.is_err());
//! assert_eq!(config.get("port").unwrap(), &Value::Integer(8080));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod configuration;
pub mod element;
pub mod error;
pub mod lifecycle;
pub mod reader;
pub mod schema;
pub mod value;
pub mod visit;

pub use configuration::{Configuration, Initializer};
pub use element::{DefaultState, Element, ElementMetadata, Payload, SubValue};
pub use error::{Error, Result};
pub use lifecycle::LifecyclePhase;
pub use reader::{reconstruct, Reader};
pub use schema::registry::SchemaRegistry;
pub use schema::{ElementKind, ElementSpec, Schema, SchemaBuilder};
pub use value::Value;
pub use visit::Visitor;
