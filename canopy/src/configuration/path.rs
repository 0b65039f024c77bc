//! Dotted-path resolution over nested configuration trees.
//!
//! A path like `limits.pool.size` is resolved one segment at a time: every
//! segment except the last must name a present, owned sub-configuration.
//! Errors raised deeper in the tree are rewrapped on the way out so they
//! always report the full path as originally given.

use crate::element::{Payload, SubValue};
use crate::error::{Error, Result};

use super::Configuration;

/// Splits off the first path segment, returning the remainder if any.
pub(crate) fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

impl Configuration {
    /// Resolves one navigation step to the named sub-configuration.
    ///
    /// `full` is the whole path as seen at this level, used verbatim in
    /// diagnostics.
    pub(crate) fn sub_child(&self, head: &str, full: &str) -> Result<&Configuration> {
        let element = self.elements.get(head).ok_or_else(|| Error::UnknownElement {
            path: full.to_string(),
            segment: head.to_string(),
        })?;
        match &element.payload {
            Payload::Item(_) => Err(Error::NotNavigable {
                path: full.to_string(),
                segment: head.to_string(),
            }),
            Payload::Sub(sub) => sub.as_config().ok_or_else(|| Error::AbsentValue {
                path: head.to_string(),
            }),
        }
    }

    /// Mutable counterpart of [`sub_child`](Self::sub_child). A shared
    /// (finalised) subtree is never handed out mutably.
    pub(crate) fn sub_child_mut(&mut self, head: &str, full: &str) -> Result<&mut Configuration> {
        let element = self
            .elements
            .get_mut(head)
            .ok_or_else(|| Error::UnknownElement {
                path: full.to_string(),
                segment: head.to_string(),
            })?;
        match &mut element.payload {
            Payload::Item(_) => Err(Error::NotNavigable {
                path: full.to_string(),
                segment: head.to_string(),
            }),
            Payload::Sub(SubValue::Owned(sub)) => Ok(sub),
            Payload::Sub(SubValue::Shared(sub)) => Err(Error::ReadOnly {
                tree_type: sub.tree_type().to_string(),
            }),
            Payload::Sub(SubValue::Absent) => Err(Error::AbsentValue {
                path: head.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::value::Value;

    fn nested() -> Configuration {
        let pool = SchemaBuilder::new("pool")
            .defaulted_item("size", "pool size", || Value::from(4i64))
            .build()
            .unwrap();
        let limits = SchemaBuilder::new("limits")
            .defaulted_sub("pool", pool.clone(), "connection pool")
            .optional_sub("spare", pool, "spare pool, left absent")
            .build()
            .unwrap();
        SchemaBuilder::new("server")
            .required_item("name", "server name")
            .defaulted_sub("limits", limits, "resource limits")
            .build()
            .unwrap()
            .construct(|cfg| cfg.set("name", Value::from("edge")))
            .unwrap()
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("name"), ("name", None));
        assert_eq!(split_path("limits.pool.size"), ("limits", Some("pool.size")));
    }

    #[test]
    fn test_deep_get() {
        let config = nested();
        assert_eq!(
            config.get("limits.pool.size").unwrap(),
            &Value::Integer(4)
        );
    }

    #[test]
    fn test_unknown_segment_reports_full_path() {
        let config = nested();
        match config.get("limits.pool.ghost") {
            Err(Error::UnknownElement { path, segment }) => {
                assert_eq!(path, "limits.pool.ghost");
                assert_eq!(segment, "ghost");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_item_segment_is_not_navigable() {
        let config = nested();
        match config.get("name.anything") {
            Err(Error::NotNavigable { path, segment }) => {
                assert_eq!(path, "name.anything");
                assert_eq!(segment, "name");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_absent_intermediate_reports_its_own_path() {
        let config = nested();
        match config.get("limits.spare.size") {
            Err(Error::AbsentValue { path }) => assert_eq!(path, "limits.spare"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_deep_set_and_mismatch() {
        let mut config = nested();
        config.set("limits.pool.size", Value::from(32i64)).unwrap();
        assert_eq!(
            config.get("limits.pool.size").unwrap(),
            &Value::Integer(32)
        );

        match config.get("limits.pool") {
            Err(Error::KindMismatch { path, .. }) => assert_eq!(path, "limits.pool"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
