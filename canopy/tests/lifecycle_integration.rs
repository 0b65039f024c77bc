//! Integration tests for the configuration lifecycle.
//!
//! These tests exercise whole workflows across modules: schema declaration,
//! construction with defaults, bulk reconfiguration with rollback,
//! finalization and aliasing, and the visitor round-trip through the
//! reader. They complement the unit tests inside each module by driving
//! several components together the way an embedding application would.

use std::rc::Rc;

use canopy::{
    reconstruct, Configuration, Error, LifecyclePhase, Schema, SchemaBuilder, SchemaRegistry,
    Value, Visitor,
};

// ============================================================================
// Test Utilities
// ============================================================================

/// A pool sub-configuration whose size must stay positive.
fn pool_schema() -> Schema {
    SchemaBuilder::new("pool")
        .defaulted_item("size", "number of pooled connections", || Value::from(4i64))
        .optional_item("label", "diagnostic label")
        .integrity_check(|cfg| match cfg.get("size").ok().and_then(Value::as_integer) {
            Some(n) if n > 0 => Ok(()),
            _ => Err("pool size must be positive".to_string()),
        })
        .build()
        .unwrap()
}

/// A server root with a required name, a checked port, and a nested pool.
fn server_schema() -> Schema {
    SchemaBuilder::new("server")
        .required_item("name", "server name")
        .optional_item("banner", "greeting banner")
        .defaulted_item("port", "listen port", || Value::from(8080i64))
        .defaulted_sub("pool", pool_schema(), "connection pool")
        .integrity_check(|cfg| match cfg.get("port").ok().and_then(Value::as_integer) {
            Some(p) if p >= 1024 => Ok(()),
            _ => Err("port below 1024".to_string()),
        })
        .build()
        .unwrap()
}

fn server() -> Configuration {
    server_schema()
        .construct(|cfg| cfg.set("name", Value::from("edge")))
        .unwrap()
}

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register(server_schema()).unwrap();
    registry
}

// ============================================================================
// Construction and defaults
// ============================================================================

#[test]
fn construction_applies_defaults_throughout_the_tree() {
    let config = server();
    assert_eq!(config.phase(), LifecyclePhase::Initialised);
    assert_eq!(config.get("port").unwrap(), &Value::Integer(8080));
    assert_eq!(config.get("pool.size").unwrap(), &Value::Integer(4));
    assert!(!config.is_present("banner").unwrap());
}

#[test]
fn initializer_values_win_over_defaults_and_checks_run_once_at_the_end() {
    // the initializer may pass through inconsistent intermediate states
    let config = server_schema()
        .construct(|cfg| {
            cfg.set("name", Value::from("edge"))?;
            cfg.set("port", Value::from(80i64))?;
            cfg.set("port", Value::from(4433i64))
        })
        .unwrap();
    assert_eq!(config.get("port").unwrap(), &Value::Integer(4433));
}

#[test]
fn construction_fails_when_the_final_state_is_invalid() {
    let err = server_schema()
        .construct(|cfg| {
            cfg.set("name", Value::from("edge"))?;
            cfg.set("port", Value::from(80i64))
        })
        .unwrap_err();
    assert!(err.is_integrity_violation());
}

// ============================================================================
// Reconfiguration across nested trees
// ============================================================================

#[test]
fn bulk_edit_spanning_parent_and_subtree_commits_atomically() {
    let mut config = server();
    config
        .reconfigure(|cfg| {
            cfg.set("port", Value::from(9090i64))?;
            cfg.set("pool.size", Value::from(32i64))?;
            cfg.set("pool.label", Value::from("hot"))
        })
        .unwrap();
    assert_eq!(config.get("port").unwrap(), &Value::Integer(9090));
    assert_eq!(config.get("pool.size").unwrap(), &Value::Integer(32));
}

#[test]
fn subtree_violation_at_close_restores_the_entire_tree() {
    let mut config = server();
    config.set("banner", Value::from("hello")).unwrap();

    let err = config
        .reconfigure(|cfg| {
            cfg.set("banner", Value::from("changed"))?;
            cfg.set("port", Value::from(2048i64))?;
            // violates the pool's own invariant, detected bottom-up at close
            cfg.set("pool.size", Value::from(-1i64))
        })
        .unwrap_err();
    assert!(err.is_integrity_violation());

    assert_eq!(config.get("banner").unwrap(), &Value::from("hello"));
    assert_eq!(config.get("port").unwrap(), &Value::Integer(8080));
    assert_eq!(config.get("pool.size").unwrap(), &Value::Integer(4));
    assert_eq!(config.phase(), LifecyclePhase::Initialised);
    assert_eq!(
        config.get_sub("pool").unwrap().phase(),
        LifecyclePhase::Initialised
    );
}

#[test]
fn single_mutations_outside_a_transaction_are_checked_immediately() {
    let mut config = server();
    let err = config.set("port", Value::from(80i64)).unwrap_err();
    assert!(err.is_integrity_violation());
    assert_eq!(config.get("port").unwrap(), &Value::Integer(8080));

    let err = config.set("pool.size", Value::from(0i64)).unwrap_err();
    assert!(err.is_integrity_violation());
    assert_eq!(config.get("pool.size").unwrap(), &Value::Integer(4));
}

// ============================================================================
// Finalization and aliasing
// ============================================================================

#[test]
fn finalized_trees_reject_every_mutation_path() {
    let mut config = server();
    config.finalize().unwrap();

    assert!(config.set("port", Value::from(2048i64)).unwrap_err().is_read_only());
    assert!(config.set("pool.size", Value::from(1i64)).unwrap_err().is_read_only());
    assert!(config.clear("banner").unwrap_err().is_read_only());
    assert!(config.begin_reconfiguration().unwrap_err().is_read_only());
    assert_eq!(config.get("name").unwrap(), &Value::from("edge"));
}

#[test]
fn duplicating_a_finalized_tree_shares_its_subtrees() {
    let mut config = server();
    config.finalize().unwrap();

    let copy = config.duplicate().unwrap();
    let original_pool = config.get_sub("pool").unwrap();
    let copied_pool = copy.get_sub("pool").unwrap();
    assert!(std::ptr::eq(original_pool, copied_pool));
}

#[test]
fn duplicating_a_live_tree_produces_an_independent_copy() {
    let mut config = server();
    let copy = config.duplicate().unwrap();

    config.set("pool.size", Value::from(64i64)).unwrap();
    assert_eq!(copy.get("pool.size").unwrap(), &Value::Integer(4));

    let mut copy = copy;
    copy.set("banner", Value::from("copy")).unwrap();
    assert!(!config.is_present("banner").unwrap());
}

#[test]
fn finalized_tree_can_seed_new_instances_via_initializer() {
    let mut source = server();
    source.set("banner", Value::from("hello")).unwrap();
    source.finalize().unwrap();

    let init = source.initializer().unwrap();
    let rebuilt = server_schema().construct(init).unwrap();

    assert_eq!(rebuilt.phase(), LifecyclePhase::Initialised);
    assert_eq!(rebuilt.get("banner").unwrap(), &Value::from("hello"));
    assert_eq!(rebuilt.get("pool.size").unwrap(), &Value::Integer(4));
    // the rebuilt tree is fully mutable again
    let mut rebuilt = rebuilt;
    rebuilt.set("port", Value::from(2048i64)).unwrap();
}

// ============================================================================
// Visitor round-trip
// ============================================================================

#[test]
fn round_trip_preserves_order_values_and_integrity_result() {
    let registry = registry();
    let original = server_schema()
        .construct(|cfg| {
            cfg.set("name", Value::from("edge"))?;
            cfg.set("banner", Value::from("hello"))?;
            cfg.set("pool.size", Value::from(9i64))
        })
        .unwrap();

    let rebuilt = reconstruct(&registry, &original).unwrap();

    assert_eq!(rebuilt.element_names(), original.element_names());
    for name in original.element_names() {
        assert_eq!(
            rebuilt.is_present(name).unwrap(),
            original.is_present(name).unwrap()
        );
    }
    assert_eq!(rebuilt.get("name").unwrap(), original.get("name").unwrap());
    assert_eq!(rebuilt.get("pool.size").unwrap(), &Value::Integer(9));
    assert_eq!(rebuilt.phase(), LifecyclePhase::Initialised);
}

#[test]
fn round_trip_of_a_finalized_tree_yields_a_mutable_rebuild() {
    let registry = registry();
    let mut original = server();
    original.finalize().unwrap();

    let mut rebuilt = reconstruct(&registry, &original).unwrap();
    assert_eq!(rebuilt.phase(), LifecyclePhase::Initialised);
    rebuilt.set("port", Value::from(2048i64)).unwrap();
}

/// Counts call-backs while forwarding nothing, proving traversal shape.
#[derive(Default)]
struct Counter {
    items: usize,
    subs: usize,
    depth: usize,
    max_depth: usize,
}

impl Visitor for Counter {
    fn begin(&mut self, _tree_type: &str) -> canopy::Result<()> {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        Ok(())
    }

    fn item(
        &mut self,
        _name: &str,
        _value: &Value,
        _metadata: &canopy::ElementMetadata,
    ) -> canopy::Result<()> {
        self.items += 1;
        Ok(())
    }

    fn begin_sub_configuration(
        &mut self,
        _name: &str,
        _tree_type: &str,
        _metadata: &canopy::ElementMetadata,
    ) -> canopy::Result<()> {
        self.subs += 1;
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        Ok(())
    }

    fn end_sub_configuration(&mut self) -> canopy::Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn end(&mut self) -> canopy::Result<()> {
        self.depth -= 1;
        Ok(())
    }
}

#[test]
fn traversal_emits_only_present_elements() {
    let config = server();
    let mut counter = Counter::default();
    config.accept(&mut counter).unwrap();
    // name + port at the root, size in the pool; banner and label absent
    assert_eq!(counter.items, 3);
    assert_eq!(counter.subs, 1);
    assert_eq!(counter.max_depth, 2);
    assert_eq!(counter.depth, 0);
}

// ============================================================================
// Ancestor updates
// ============================================================================

#[test]
fn descendant_values_apply_onto_an_ancestor_shape() {
    let base = SchemaBuilder::new("base")
        .required_item("name", "name")
        .optional_item("note", "note")
        .build()
        .unwrap();
    let derived = SchemaBuilder::new("derived")
        .required_item("name", "name")
        .optional_item("note", "note")
        .required_item("extra", "extra")
        .build()
        .unwrap();

    let source = derived
        .construct(|cfg| {
            cfg.set("name", Value::from("child"))?;
            cfg.set("extra", Value::from(1i64))
        })
        .unwrap();
    let mut target = base
        .construct(|cfg| {
            cfg.set("name", Value::from("parent"))?;
            cfg.set("note", Value::from("keep?"))
        })
        .unwrap();

    target.reconfigure(|cfg| source.apply_onto(cfg)).unwrap();

    assert_eq!(target.get("name").unwrap(), &Value::from("child"));
    // absent in the source, so cleared on the target
    assert!(!target.is_present("note").unwrap());
}

// ============================================================================
// Shared schema handles
// ============================================================================

#[test]
fn one_schema_drives_many_independent_instances() {
    let schema = Rc::new(server_schema());
    let mut first = schema
        .construct(|cfg| cfg.set("name", Value::from("a")))
        .unwrap();
    let second = schema
        .construct(|cfg| cfg.set("name", Value::from("b")))
        .unwrap();

    first.set("port", Value::from(5000i64)).unwrap();
    assert_eq!(second.get("port").unwrap(), &Value::Integer(8080));
    assert_eq!(first.get("name").unwrap(), &Value::from("a"));
    assert_eq!(second.get("name").unwrap(), &Value::from("b"));
}

#[test]
fn errors_carry_full_paths_across_nesting() {
    let config = server();
    match config.get("pool.ghost") {
        Err(Error::UnknownElement { path, segment }) => {
            assert_eq!(path, "pool.ghost");
            assert_eq!(segment, "ghost");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    match config.get("name.inner") {
        Err(Error::NotNavigable { path, segment }) => {
            assert_eq!(path, "name.inner");
            assert_eq!(segment, "name");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
