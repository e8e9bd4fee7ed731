//! Register / unregister / is_registered against the in-memory engine

use std::collections::BTreeSet;

use symtab_core::engine::{ArrayOps, SymbolTable};
use symtab_core::error::{Error, RemoteError, Result};
use symtab_core::handle::{RemoteHandle, StringsPart};
use symtab_core::protocol::{DTypeHint, DeleteOutcome, RawObject, Scope};
use symtab_core::scalar::Scalar;
use symtab_engine::MemoryEngine;
use symtab_registry::{
    clear, delete, is_registered, list_registry, list_symbol_table, register, strings_part, unregister,
    unregister_by_name,
};

fn ints(values: &[i64]) -> Vec<Scalar> {
    values.iter().map(|v| Scalar::I64(*v)).collect()
}

fn strs(values: &[&str]) -> Vec<Scalar> {
    values.iter().map(|v| Scalar::from(*v)).collect()
}

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_register_then_is_registered() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1, 2, 3])).unwrap();
    assert!(!is_registered(&engine, &h).unwrap());

    let h = register(&engine, h, "a").unwrap();
    assert_eq!(h.name(), "a");
    assert_eq!(h.component_names().to_vec(), vec!["a".to_string()]);
    assert!(is_registered(&engine, &h).unwrap());
    assert_eq!(list_registry(&engine).unwrap(), names(&["a"]));
}

#[test]
fn test_unregister_reports_false_immediately() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1, 2, 3])).unwrap();
    let h = register(&engine, h, "a").unwrap();

    unregister(&engine, &h).unwrap();
    assert!(!is_registered(&engine, &h).unwrap());
    // Still usable until the next clear.
    assert_eq!(engine.fetch(&h).unwrap(), ints(&[1, 2, 3]));
}

#[test]
fn test_reregister_renames_without_copying() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[4, 5])).unwrap();
    let h = register(&engine, h, "first").unwrap();
    let h = register(&engine, h, "second").unwrap();

    assert_eq!(h.name(), "second");
    assert_eq!(list_symbol_table(&engine).unwrap(), names(&["second"]));
    assert_eq!(list_registry(&engine).unwrap(), names(&["second"]));
    assert_eq!(engine.fetch(&h).unwrap(), ints(&[4, 5]));
}

#[test]
fn test_register_same_name_twice_is_idempotent() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1])).unwrap();
    let h = register(&engine, h, "a").unwrap();
    let h = register(&engine, h, "a").unwrap();
    assert!(is_registered(&engine, &h).unwrap());
    assert_eq!(list_symbol_table(&engine).unwrap().len(), 1);
}

#[test]
fn test_naming_conflict_with_different_object() {
    let engine = MemoryEngine::default();
    let a = engine.create(ints(&[1])).unwrap();
    register(&engine, a, "a").unwrap();
    let b = engine.create(ints(&[2])).unwrap();

    let err = register(&engine, b.clone(), "a").unwrap_err();
    match err {
        Error::NamingConflict { name } => assert_eq!(name, "a"),
        other => panic!("Expected NamingConflict, got {other:?}"),
    }
    // Nothing was mutated.
    assert!(!is_registered(&engine, &b).unwrap());
}

#[test]
fn test_plain_over_categorical_name_is_conflict() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["x", "y"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let c = register(&engine, c, "c").unwrap();

    let plain = engine.create(ints(&[1, 2])).unwrap();
    let err = register(&engine, plain.clone(), "c").unwrap_err();
    match err {
        Error::NamingConflict { name } => assert_eq!(name, "c"),
        other => panic!("Expected NamingConflict, got {other:?}"),
    }
    assert!(!is_registered(&engine, &plain).unwrap());
    assert!(is_registered(&engine, &c).unwrap());
}

#[test]
fn test_categorical_over_plain_name_is_conflict() {
    let engine = MemoryEngine::default();
    let plain = engine.create(ints(&[1, 2])).unwrap();
    register(&engine, plain, "a").unwrap();

    let s = engine.create(strs(&["x", "y"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let err = register(&engine, c, "a").unwrap_err();
    assert!(matches!(err, Error::NamingConflict { ref name } if name == "a"));
    assert_eq!(list_registry(&engine).unwrap(), names(&["a"]));
}

#[test]
fn test_unregistered_object_still_holds_its_name() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["x"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let c = register(&engine, c, "c").unwrap();
    unregister(&engine, &c).unwrap();

    let plain = engine.create(ints(&[1])).unwrap();
    assert!(matches!(
        register(&engine, plain.clone(), "c"),
        Err(Error::NamingConflict { .. })
    ));

    clear(&engine).unwrap();
    let plain = engine.create(ints(&[1])).unwrap();
    assert_eq!(register(&engine, plain, "c").unwrap().name(), "c");
}

#[test]
fn test_strings_name_blocked_by_foreign_part_symbol() {
    let engine = MemoryEngine::default();
    let other = engine.create(ints(&[42, 43])).unwrap();
    register(&engine, other, "s_bytes").unwrap();

    let s = engine.create(strs(&["ab"])).unwrap();
    let err = register(&engine, s, "s").unwrap_err();
    assert!(matches!(err, Error::NamingConflict { ref name } if name == "s"));
}

#[test]
fn test_strings_part_never_reuses_foreign_symbol() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["ab"])).unwrap();
    let s = register(&engine, s, "s").unwrap();
    let other = engine.create(ints(&[42, 43])).unwrap();
    register(&engine, other, "s_bytes").unwrap();

    let err = strings_part(&engine, s, StringsPart::Bytes).unwrap_err();
    assert!(matches!(err, Error::Remote(RemoteError::Rejected(_))));
    let held = engine.attach("s_bytes", DTypeHint::Infer).unwrap();
    assert_eq!(held.dtype, Some(symtab_core::dtype::DType::Int64));
}

#[test]
fn test_invalid_names_rejected() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1])).unwrap();
    for bad in ["", "a.b", "has space"] {
        let err = register(&engine, h.clone(), bad).unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }), "{bad:?} -> {err:?}");
    }
}

#[test]
fn test_categorical_registers_every_component() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["x", "y", "x"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let c = register(&engine, c, "c").unwrap();

    assert_eq!(
        c.component_names().to_vec(),
        vec!["c.codes".to_string(), "c.categories".to_string()]
    );
    assert!(is_registered(&engine, &c).unwrap());
    assert_eq!(engine.fetch(&c).unwrap(), strs(&["x", "y", "x"]));
}

#[test]
fn test_out_of_band_component_unregister_is_inconsistent() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["x", "y", "x"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let c = register(&engine, c, "c").unwrap();

    unregister_by_name(&engine, "c.codes", DTypeHint::Infer).unwrap();

    let err = is_registered(&engine, &c).unwrap_err();
    assert!(err.is_inconsistency());
    match err {
        Error::Inconsistent {
            object,
            registered,
            unregistered,
        } => {
            assert_eq!(object, "c");
            assert_eq!(registered, vec!["c.categories".to_string()]);
            assert_eq!(unregistered, vec!["c.codes".to_string()]);
        }
        other => panic!("Expected Inconsistent, got {other:?}"),
    }
}

#[test]
fn test_unregister_by_name_drops_all_components() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["x", "y"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let c = register(&engine, c, "c").unwrap();

    let msg = unregister_by_name(&engine, "c", DTypeHint::Infer).unwrap();
    assert!(msg.contains("2 of 2"), "{msg}");
    assert!(!is_registered(&engine, &c).unwrap());
}

#[test]
fn test_delete_refuses_registered_objects() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1, 2])).unwrap();
    let h = register(&engine, h, "keep").unwrap();
    assert_eq!(delete(&engine, &h).unwrap(), DeleteOutcome::RegisteredNotDeleted);
    assert!(list_symbol_table(&engine).unwrap().contains("keep"));

    unregister(&engine, &h).unwrap();
    assert_eq!(delete(&engine, &h).unwrap(), DeleteOutcome::Deleted);
    assert!(list_symbol_table(&engine).unwrap().is_empty());
}

#[test]
fn test_strings_part_registers_with_parent() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["ab", "c"])).unwrap();
    let (s, bytes) = strings_part(&engine, s, StringsPart::Bytes).unwrap();
    assert_eq!(
        engine.fetch(&bytes).unwrap(),
        vec![
            Scalar::U64(97),
            Scalar::U64(98),
            Scalar::U64(0),
            Scalar::U64(99),
            Scalar::U64(0)
        ]
    );

    let s = register(&engine, s, "s").unwrap();
    assert_eq!(s.part(StringsPart::Bytes), Some("s_bytes"));
    assert_eq!(list_registry(&engine).unwrap(), names(&["s", "s_bytes"]));

    unregister(&engine, &s).unwrap();
    assert!(list_registry(&engine).unwrap().is_empty());
}

#[test]
fn test_strings_part_of_registered_parent_is_registered_and_reused() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["ab", "c"])).unwrap();
    let s = register(&engine, s, "s").unwrap();

    let (s, offsets) = strings_part(&engine, s, StringsPart::Offsets).unwrap();
    assert_eq!(offsets.name(), "s_offsets");
    assert_eq!(engine.fetch(&offsets).unwrap(), ints(&[0, 3]));
    assert!(list_registry(&engine).unwrap().contains("s_offsets"));

    let before = list_symbol_table(&engine).unwrap().len();
    let (_, again) = strings_part(&engine, s, StringsPart::Offsets).unwrap();
    assert_eq!(again.name(), "s_offsets");
    assert_eq!(list_symbol_table(&engine).unwrap().len(), before);
}

#[test]
fn test_strings_parts_do_not_affect_unanimity() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["ab"])).unwrap();
    let (s, _) = strings_part(&engine, s, StringsPart::Bytes).unwrap();
    let s = register(&engine, s, "s").unwrap();

    unregister_by_name(&engine, "s_bytes", DTypeHint::Infer).unwrap();
    assert!(is_registered(&engine, &s).unwrap());
}

/// Symbol table whose `register` fails for one target name.
struct FlakyTable {
    inner: MemoryEngine,
    fail_on: &'static str,
}

impl SymbolTable for FlakyTable {
    fn attach(&self, name: &str, hint: DTypeHint) -> Result<RawObject> {
        self.inner.attach(name, hint)
    }

    fn register(&self, name: &str, new_name: &str) -> Result<String> {
        if new_name == self.fail_on {
            return Err(RemoteError::Rejected(format!("cannot register {new_name}")).into());
        }
        self.inner.register(name, new_name)
    }

    fn unregister(&self, name: &str) -> Result<()> {
        self.inner.unregister(name)
    }

    fn list(&self, scope: Scope) -> Result<BTreeSet<String>> {
        self.inner.list(scope)
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()
    }

    fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.inner.delete(name)
    }

    fn unregister_by_name(&self, name: &str, hint: DTypeHint) -> Result<String> {
        self.inner.unregister_by_name(name, hint)
    }
}

#[test]
fn test_partial_registration_is_reported_not_rolled_back() {
    let table = FlakyTable {
        inner: MemoryEngine::default(),
        fail_on: "c.categories",
    };
    let s = table.inner.create(strs(&["x", "y"])).unwrap();
    let c: RemoteHandle = table.inner.categorical(&s).unwrap();

    let err = register(&table, c.clone(), "c").unwrap_err();
    assert!(err.is_inconsistency());
    match &err {
        Error::PartialUpdate {
            object,
            operation,
            failed,
            completed,
            ..
        } => {
            assert_eq!(object, c.name());
            assert_eq!(*operation, "register");
            assert_eq!(failed, "c.categories");
            assert_eq!(completed, &vec!["c.codes".to_string()]);
        }
        other => panic!("Expected PartialUpdate, got {other:?}"),
    }

    // The half-registered object is visible as an inconsistency.
    let as_registered = c.renamed("c");
    let err = is_registered(&table, &as_registered).unwrap_err();
    assert!(matches!(err, Error::Inconsistent { .. }));
}

#[test]
fn test_failure_on_first_component_is_plain_remote_error() {
    let table = FlakyTable {
        inner: MemoryEngine::default(),
        fail_on: "c.codes",
    };
    let s = table.inner.create(strs(&["x"])).unwrap();
    let c = table.inner.categorical(&s).unwrap();

    let err = register(&table, c, "c").unwrap_err();
    assert!(matches!(err, Error::Remote(RemoteError::Rejected(_))));
    assert!(list_registry(&table).unwrap().is_empty());
}
