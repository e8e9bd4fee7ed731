//! Attach, bulk clear and prefix-based bulk operations

use std::collections::{BTreeMap, BTreeSet};

use symtab_core::dtype::{DType, ObjectKind};
use symtab_core::engine::{ArrayOps, SymbolTable};
use symtab_core::error::{Error, RemoteError, Result};
use symtab_core::handle::StringsPart;
use symtab_core::protocol::{DTypeHint, DeleteOutcome, RawObject, Scope, TypeTag};
use symtab_core::scalar::Scalar;
use symtab_engine::MemoryEngine;
use symtab_registry::{
    attach, attach_all, clear, is_registered, list_registry, list_symbol_table, register,
    register_all, strings_part, unregister_all, Attached, Collection, GroupedResult, Table,
};

fn ints(values: &[i64]) -> Vec<Scalar> {
    values.iter().map(|v| Scalar::I64(*v)).collect()
}

fn strs(values: &[&str]) -> Vec<Scalar> {
    values.iter().map(|v| Scalar::from(*v)).collect()
}

#[test]
fn test_attach_from_another_handle_matches() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[7, 8, 9])).unwrap();
    let h = register(&engine, h, "a").unwrap();

    let attached = attach(&engine, "a", DTypeHint::Infer).unwrap().into_handle().unwrap();
    assert_eq!(attached, h);
    assert_eq!(attached.dtype(), DType::Int64);
    assert_eq!(engine.fetch(&attached).unwrap(), engine.fetch(&h).unwrap());
}

#[test]
fn test_clear_keeps_registered_and_drops_the_rest() {
    let engine = MemoryEngine::default();
    let a = engine.create(ints(&[1; 10])).unwrap();
    let a = register(&engine, a, "a").unwrap();
    let b = engine.create(ints(&[1; 10])).unwrap();

    clear(&engine).unwrap();

    assert_eq!(
        list_symbol_table(&engine).unwrap(),
        list_registry(&engine).unwrap()
    );
    let err = engine.fetch(&b).unwrap_err();
    assert!(err.is_unknown_symbol());

    let again = attach(&engine, "a", DTypeHint::Infer).unwrap().into_handle().unwrap();
    assert_eq!(engine.fetch(&again).unwrap(), ints(&[1; 10]));
    assert_eq!(again, a);
}

#[test]
fn test_attach_unknown_name_is_remote_error() {
    let engine = MemoryEngine::default();
    let err = attach(&engine, "nope", DTypeHint::Infer).unwrap_err();
    assert!(matches!(
        err,
        Error::Remote(RemoteError::UnknownSymbol(ref n)) if n == "nope"
    ));
}

#[test]
fn test_attach_with_wrong_hint_fails() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1])).unwrap();
    register(&engine, h, "a").unwrap();
    let err = attach(&engine, "a", DTypeHint::Tag(TypeTag::Categorical)).unwrap_err();
    assert!(err.is_unknown_symbol());
}

#[test]
fn test_attach_restores_categorical() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["b", "a", "b"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    let c = register(&engine, c, "c").unwrap();

    let attached = attach(&engine, "c", DTypeHint::Infer).unwrap();
    assert_eq!(attached.tag(), TypeTag::Categorical);
    let h = attached.into_handle().unwrap();
    assert_eq!(h.kind(), ObjectKind::Categorical);
    assert_eq!(h, c);
    assert_eq!(engine.fetch(&h).unwrap(), strs(&["b", "a", "b"]));
}

#[test]
fn test_attach_restores_segmented_array() {
    let engine = MemoryEngine::default();
    let segments = engine.create(ints(&[0, 2])).unwrap();
    let values = engine.create(ints(&[1, 2, 3, 4])).unwrap();
    let sa = engine.segarray(&segments, &values).unwrap();
    let sa = register(&engine, sa, "sa").unwrap();

    let h = attach(&engine, "sa", DTypeHint::Infer).unwrap().into_handle().unwrap();
    assert_eq!(h.kind(), ObjectKind::SegArray);
    assert_eq!(h.size(), 2);
    assert_eq!(h, sa);
}

#[test]
fn test_attach_picks_up_registered_strings_parts() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["ab", "c"])).unwrap();
    let (s, _) = strings_part(&engine, s, StringsPart::Bytes).unwrap();
    let s = register(&engine, s, "s").unwrap();

    let attached = attach(&engine, "s", DTypeHint::Infer).unwrap().into_handle().unwrap();
    assert_eq!(attached.part(StringsPart::Bytes), Some("s_bytes"));
    assert_eq!(attached.part(StringsPart::Offsets), None);
    assert_eq!(attached, s);
    // Absent parts are not materialized by attach.
    assert!(!list_symbol_table(&engine).unwrap().contains("s_offsets"));
}

#[test]
fn test_grouped_result_round_trip() {
    let engine = MemoryEngine::default();
    let k = engine.create(ints(&[1, 2, 1])).unwrap();
    let g = GroupedResult::group_by(&engine, vec![k]).unwrap();
    assert_eq!(g.num_groups(), 2);
    let g = register(&engine, g, "g").unwrap();
    assert!(is_registered(&engine, &g).unwrap());

    clear(&engine).unwrap();
    let attached = attach(&engine, "g", DTypeHint::Infer).unwrap();
    assert_eq!(attached.tag(), TypeTag::GroupedResult);
    let back = attached.into_grouped().unwrap();
    assert_eq!(back, g);
    assert_eq!(engine.fetch(&back.unique_keys()[0]).unwrap(), ints(&[1, 2]));
    assert_eq!(engine.fetch(back.segments()).unwrap(), ints(&[0, 2]));
}

#[test]
fn test_table_round_trip() {
    let engine = MemoryEngine::default();
    let price = engine.create(vec![Scalar::F64(1.5), Scalar::F64(2.5)]).unwrap();
    let sym = engine.create(strs(&["x", "y"])).unwrap();
    let idx = engine.create(ints(&[10, 20])).unwrap();
    let t = Table::new(
        &engine,
        vec![("price".into(), price), ("sym".into(), sym)],
        vec![idx],
    )
    .unwrap();
    let t = register(&engine, t, "t").unwrap();

    let names = list_registry(&engine).unwrap();
    for expected in ["t.columns", "t.col_0", "t.col_1", "t.index_key_0"] {
        assert!(names.contains(expected), "missing {expected}");
    }

    let back = attach(&engine, "t", DTypeHint::Infer).unwrap().into_table().unwrap();
    assert_eq!(back, t);
    assert_eq!(back.labels(), vec!["price", "sym"]);
    let col = back.column("sym").unwrap();
    assert_eq!(engine.fetch(col).unwrap(), strs(&["x", "y"]));
}

#[test]
fn test_table_rejects_ragged_columns() {
    let engine = MemoryEngine::default();
    let a = engine.create(ints(&[1, 2])).unwrap();
    let b = engine.create(ints(&[1])).unwrap();
    let err = Table::new(&engine, vec![("a".into(), a), ("b".into(), b)], vec![]).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn test_register_all_and_attach_all() {
    let engine = MemoryEngine::default();
    let mut items = BTreeMap::new();
    items.insert("first col".to_string(), engine.create(ints(&[1])).unwrap());
    items.insert("b".to_string(), engine.create(ints(&[2])).unwrap());

    let registered = register_all(&engine, Collection::Map(items), "run_", true).unwrap();
    assert_eq!(registered.len(), 2);
    let expected: BTreeSet<String> = ["run_b", "run_first_col"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(list_registry(&engine).unwrap(), expected);

    let found = attach_all(&engine, "run_").unwrap();
    assert_eq!(
        found.keys().cloned().collect::<Vec<_>>(),
        vec!["b".to_string(), "first_col".to_string()]
    );
    let b = found["b"].as_handle().unwrap();
    assert_eq!(engine.fetch(b).unwrap(), ints(&[2]));
}

#[test]
fn test_register_all_sequence_uses_positions() {
    let engine = MemoryEngine::default();
    let items = vec![
        engine.create(ints(&[1])).unwrap(),
        engine.create(ints(&[2])).unwrap(),
    ];
    register_all(&engine, Collection::Seq(items), "seq_", false).unwrap();
    let found = attach_all(&engine, "seq_").unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.contains_key("0") && found.contains_key("1"));
}

#[test]
fn test_register_all_overwrite_replaces_previous_run() {
    let engine = MemoryEngine::default();
    let first = vec![engine.create(ints(&[1])).unwrap()];
    register_all(&engine, Collection::Seq(first), "p_", true).unwrap();

    let second = vec![engine.create(ints(&[2])).unwrap()];
    let err = register_all(&engine, Collection::Seq(second.clone()), "p_", false).unwrap_err();
    assert!(matches!(err, Error::NamingConflict { .. }));

    register_all(&engine, Collection::Seq(second), "p_", true).unwrap();
    let found = attach_all(&engine, "p_").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(engine.fetch(found["0"].as_handle().unwrap()).unwrap(), ints(&[2]));
}

#[test]
fn test_register_all_overwrite_leaves_other_keys_alone() {
    let engine = MemoryEngine::default();
    let mut first = BTreeMap::new();
    first.insert("old".to_string(), engine.create(ints(&[1])).unwrap());
    let first = register_all(&engine, Collection::Map(first), "run_", true).unwrap();
    let kept = match first {
        Collection::Map(m) => m["old"].clone(),
        Collection::Seq(_) => panic!("Expected a map back"),
    };

    let mut second = BTreeMap::new();
    second.insert("new".to_string(), engine.create(ints(&[2])).unwrap());
    register_all(&engine, Collection::Map(second), "run_", true).unwrap();

    assert_eq!(engine.fetch(&kept).unwrap(), ints(&[1]));
    assert!(is_registered(&engine, &kept).unwrap());
    let found = attach_all(&engine, "run_").unwrap();
    assert_eq!(found.keys().cloned().collect::<Vec<_>>(), vec!["new", "old"]);
}

#[test]
fn test_register_all_overwrite_unregisters_locale_copy_without_deleting() {
    let engine = MemoryEngine::default();
    let old = engine.create(ints(&[1])).unwrap();
    let old = register(&engine, old, "0_run_k").unwrap();

    let mut fresh = BTreeMap::new();
    fresh.insert("k".to_string(), engine.create(ints(&[2])).unwrap());
    register_all(&engine, Collection::Map(fresh), "run_", true).unwrap();

    // Same key, different name: dropped from the registry but still usable.
    assert!(!is_registered(&engine, &old).unwrap());
    assert_eq!(engine.fetch(&old).unwrap(), ints(&[1]));
    assert_eq!(
        list_registry(&engine).unwrap(),
        BTreeSet::from(["run_k".to_string()])
    );

    clear(&engine).unwrap();
    assert!(engine.fetch(&old).unwrap_err().is_unknown_symbol());
}

#[test]
fn test_attach_ambiguous_name_needs_hint() {
    let engine = MemoryEngine::default();
    let plain = engine.create(ints(&[1, 2])).unwrap();
    let s = engine.create(strs(&["x", "y"])).unwrap();
    let cat = engine.categorical(&s).unwrap();

    // Bypass the client-side conflict check to leave two objects under "c".
    SymbolTable::register(&engine, plain.name(), "c").unwrap();
    let comps = cat.component_names().to_vec();
    SymbolTable::register(&engine, &comps[0], "c.codes").unwrap();
    SymbolTable::register(&engine, &comps[1], "c.categories").unwrap();

    let err = attach(&engine, "c", DTypeHint::Infer).unwrap_err();
    assert!(matches!(err, Error::Remote(RemoteError::Rejected(ref m)) if m.contains("ambiguous")));

    let cat = attach(&engine, "c", DTypeHint::Tag(TypeTag::Categorical)).unwrap();
    assert_eq!(cat.tag(), TypeTag::Categorical);
    let plain = attach(&engine, "c", DTypeHint::Tag(TypeTag::Plain)).unwrap();
    assert_eq!(plain.tag(), TypeTag::Plain);
}

#[test]
fn test_attach_all_groups_components_and_locale_prefix() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["x", "y"])).unwrap();
    let c = engine.categorical(&s).unwrap();
    register(&engine, c, "pre_cat").unwrap();
    let h = engine.create(ints(&[5])).unwrap();
    register(&engine, h, "0_pre_num").unwrap();
    let other = engine.create(ints(&[6])).unwrap();
    register(&engine, other, "elsewhere").unwrap();

    let found = attach_all(&engine, "pre_").unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["cat"].tag(), TypeTag::Categorical);
    assert_eq!(found["num"].name(), "0_pre_num");
}

#[test]
fn test_attach_all_returns_strings_with_parts() {
    let engine = MemoryEngine::default();
    let s = engine.create(strs(&["ab"])).unwrap();
    let (s, _) = strings_part(&engine, s, StringsPart::Offsets).unwrap();
    register(&engine, s, "pre_s").unwrap();

    let found = attach_all(&engine, "pre_").unwrap();
    assert_eq!(found.len(), 1);
    let s = found["s"].as_handle().unwrap();
    assert_eq!(s.part(StringsPart::Offsets), Some("pre_s_offsets"));
}

#[test]
fn test_unregister_all() {
    let engine = MemoryEngine::default();
    let items = vec![
        engine.create(ints(&[1])).unwrap(),
        engine.create(ints(&[2])).unwrap(),
    ];
    register_all(&engine, Collection::Seq(items), "u_", false).unwrap();
    let keep = engine.create(ints(&[3])).unwrap();
    register(&engine, keep, "keep").unwrap();

    let dropped = unregister_all(&engine, "u_").unwrap();
    assert_eq!(dropped, vec!["0".to_string(), "1".to_string()]);
    let expected: BTreeSet<String> = ["keep".to_string()].into_iter().collect();
    assert_eq!(list_registry(&engine).unwrap(), expected);
}

/// Engine stub whose attach replies carry a tag this client does not know.
struct FutureEngine;

impl SymbolTable for FutureEngine {
    fn attach(&self, name: &str, _hint: DTypeHint) -> Result<RawObject> {
        Ok(RawObject {
            tag: "sparse-matrix".into(),
            name: name.into(),
            dtype: Some(DType::Float64),
            size: 4,
            components: vec![name.into()],
            parts: vec![],
        })
    }

    fn register(&self, _name: &str, new_name: &str) -> Result<String> {
        Ok(new_name.to_string())
    }

    fn unregister(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn list(&self, _scope: Scope) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _name: &str) -> Result<DeleteOutcome> {
        Ok(DeleteOutcome::Deleted)
    }

    fn unregister_by_name(&self, name: &str, _hint: DTypeHint) -> Result<String> {
        Ok(format!("unregistered {name}"))
    }
}

#[test]
fn test_unknown_remote_type_is_distinct_error() {
    let err = attach(&FutureEngine, "m", DTypeHint::Infer).unwrap_err();
    match err {
        Error::UnknownRemoteType { tag } => assert_eq!(tag, "sparse-matrix"),
        other => panic!("Expected UnknownRemoteType, got {other:?}"),
    }
}

#[test]
fn test_attached_serializes_with_type_tag() {
    let engine = MemoryEngine::default();
    let h = engine.create(ints(&[1])).unwrap();
    register(&engine, h, "a").unwrap();
    let attached = attach(&engine, "a", DTypeHint::Infer).unwrap();
    let json = serde_json::to_value(&attached).unwrap();
    assert_eq!(json["type"], "handle");
    let back: Attached = serde_json::from_value(json).unwrap();
    assert_eq!(back, attached);
}
