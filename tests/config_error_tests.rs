//! Configuration, naming rules and error helpers

use symtab_core::config::ClientConfig;
use symtab_core::dtype::ObjectKind;
use symtab_core::error::{Error, RemoteError};
use symtab_core::handle::StringsPart;
use symtab_core::naming;
use symtab_core::protocol::{DTypeHint, TypeTag};

#[test]
fn test_default_config_is_valid() {
    let cfg = ClientConfig::default();
    assert_eq!(cfg.anon_prefix, "id_");
    assert_eq!(cfg.num_locales, 1);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_config_validation_rejects_bad_values() {
    let cases = [
        ClientConfig {
            anon_prefix: String::new(),
            ..ClientConfig::default()
        },
        ClientConfig {
            anon_prefix: "tmp.".into(),
            ..ClientConfig::default()
        },
        ClientConfig {
            num_locales: 0,
            ..ClientConfig::default()
        },
    ];
    for cfg in cases {
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{cfg:?} -> {err:?}");
    }
}

#[test]
fn test_context_chain_and_root() {
    let err = Error::TypeMismatch("Index types must match".into())
        .with_context("while merging")
        .with_context("in export");
    assert!(matches!(err.root(), Error::TypeMismatch(_)));
    let text = err.to_string();
    assert!(text.contains("in export"), "{text}");
}

#[test]
fn test_inconsistency_helpers_see_through_context() {
    let err = Error::Inconsistent {
        object: "c".into(),
        registered: vec!["c.categories".into()],
        unregistered: vec!["c.codes".into()],
    }
    .with_context("checking c");
    assert!(err.is_inconsistency());
    assert!(!err.is_unknown_symbol());
    assert!(!err.suggestions().is_empty());

    let err = Error::from(RemoteError::UnknownSymbol("id_3".into()));
    assert!(err.is_unknown_symbol());
    assert!(!err.is_inconsistency());
}

#[test]
fn test_suggestions_for_naming_conflict() {
    let err = Error::NamingConflict { name: "a".into() };
    let hints = err.suggestions();
    assert!(hints.iter().any(|h| h.contains("'a'")));
    assert!(Error::TypeMismatch("x".into()).suggestions().is_empty());
}

#[test]
fn test_naming_validate() {
    assert!(naming::validate("prices").is_ok());
    assert!(naming::validate("run_0").is_ok());
    for bad in ["", "a.b", "tab\there"] {
        assert!(matches!(
            naming::validate(bad),
            Err(Error::InvalidName { .. })
        ));
    }
}

#[test]
fn test_naming_helpers() {
    assert_eq!(naming::sanitize("first col"), "first_col");
    assert_eq!(
        naming::component_names(ObjectKind::Categorical, "c"),
        vec!["c.codes".to_string(), "c.categories".to_string()]
    );
    assert_eq!(
        naming::component_names(ObjectKind::SegArray, "sa"),
        vec!["sa.segments".to_string(), "sa.values".to_string()]
    );
    assert_eq!(naming::strings_part("s", StringsPart::Offsets), "s_offsets");
    assert_eq!(naming::index_key("idx"), "idx_key");
    assert_eq!(naming::multi_index_key("mi", 1), "mi_key_1");
    assert_eq!(naming::group_unique_keys("g", 0), "g.unique_keys_0");
    assert_eq!(naming::table_column("t", 2), "t.col_2");

    assert_eq!(naming::object_root("c.codes"), "c");
    assert_eq!(naming::object_root("plain"), "plain");
    assert_eq!(naming::strings_parent("s_bytes"), Some("s"));
    assert_eq!(naming::strings_parent("_bytes"), None);
    assert_eq!(naming::strings_parent("s"), None);
}

#[test]
fn test_type_tag_and_hint_parsing() {
    for tag in TypeTag::ALL {
        assert_eq!(tag.as_str().parse::<TypeTag>().unwrap(), tag);
    }
    assert_eq!("infer".parse::<DTypeHint>().unwrap(), DTypeHint::Infer);
    assert_eq!(
        "segmented-array".parse::<DTypeHint>().unwrap(),
        DTypeHint::Tag(TypeTag::SegArray)
    );
    let err = "sparse-matrix".parse::<TypeTag>().unwrap_err();
    assert!(matches!(err, Error::UnknownRemoteType { ref tag } if tag == "sparse-matrix"));
}
