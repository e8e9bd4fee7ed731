//! Rebuilding typed objects from attach replies.

use serde::{Deserialize, Serialize};
use tracing::debug;

use symtab_core::dtype::{DType, ObjectKind};
use symtab_core::engine::SymbolTable;
use symtab_core::error::{Error, Result};
use symtab_core::handle::{RemoteHandle, StringsPart};
use symtab_core::naming;
use symtab_core::protocol::{DTypeHint, RawObject, RawPart, Scope, TypeTag};

use crate::objects::{GroupedResult, Table};
use crate::registrable::Registrable;

/// An object resolved from a durable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attached {
    /// Plain, strings, categorical or segmented array.
    Handle(RemoteHandle),
    Grouped(GroupedResult),
    Table(Table),
}

impl Attached {
    pub fn name(&self) -> &str {
        match self {
            Attached::Handle(h) => h.name(),
            Attached::Grouped(g) => g.name(),
            Attached::Table(t) => t.name(),
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Attached::Handle(h) => match h.kind() {
                ObjectKind::Array => TypeTag::Plain,
                ObjectKind::Strings => TypeTag::String,
                ObjectKind::Categorical => TypeTag::Categorical,
                ObjectKind::SegArray => TypeTag::SegArray,
            },
            Attached::Grouped(_) => TypeTag::GroupedResult,
            Attached::Table(_) => TypeTag::Tabular,
        }
    }

    pub fn as_handle(&self) -> Option<&RemoteHandle> {
        match self {
            Attached::Handle(h) => Some(h),
            _ => None,
        }
    }

    pub fn into_handle(self) -> Result<RemoteHandle> {
        match self {
            Attached::Handle(h) => Ok(h),
            other => Err(Error::TypeMismatch(format!(
                "'{}' is a {} object, not an array",
                other.name(),
                other.tag()
            ))),
        }
    }

    pub fn into_grouped(self) -> Result<GroupedResult> {
        match self {
            Attached::Grouped(g) => Ok(g),
            other => Err(Error::TypeMismatch(format!(
                "'{}' is a {} object, not a grouped result",
                other.name(),
                other.tag()
            ))),
        }
    }

    pub fn into_table(self) -> Result<Table> {
        match self {
            Attached::Table(t) => Ok(t),
            other => Err(Error::TypeMismatch(format!(
                "'{}' is a {} object, not a table",
                other.name(),
                other.tag()
            ))),
        }
    }
}

impl Registrable for Attached {
    fn label(&self) -> String {
        self.name().to_string()
    }

    fn component_names(&self) -> Vec<String> {
        match self {
            Attached::Handle(h) => Registrable::component_names(h),
            Attached::Grouped(g) => g.component_names(),
            Attached::Table(t) => t.component_names(),
        }
    }

    fn registered_names(&self, name: &str) -> Vec<String> {
        match self {
            Attached::Handle(h) => h.registered_names(name),
            Attached::Grouped(g) => g.registered_names(name),
            Attached::Table(t) => t.registered_names(name),
        }
    }

    fn with_name(self, name: &str) -> Self {
        match self {
            Attached::Handle(h) => Attached::Handle(h.with_name(name)),
            Attached::Grouped(g) => Attached::Grouped(g.with_name(name)),
            Attached::Table(t) => Attached::Table(t.with_name(name)),
        }
    }

    fn required_names(&self) -> Vec<String> {
        match self {
            Attached::Handle(h) => Registrable::required_names(h),
            Attached::Grouped(g) => g.required_names(),
            Attached::Table(t) => t.required_names(),
        }
    }
}

/// Resolve a durable name to a fresh local object without recreating server state.
///
/// Strings objects pick up any `<name>_bytes` / `<name>_offsets` parts
/// already present in the registry; absent parts are not materialized.
pub fn attach(
    engine: &(impl SymbolTable + ?Sized),
    name: &str,
    hint: DTypeHint,
) -> Result<Attached> {
    let raw = engine.attach(name, hint)?;
    let attached = from_raw(raw)?;
    let attached = match attached {
        Attached::Handle(h) if h.kind() == ObjectKind::Strings => {
            Attached::Handle(with_registered_parts(engine, h)?)
        }
        other => other,
    };
    debug!(name, tag = %attached.tag(), "attached");
    Ok(attached)
}

fn with_registered_parts(
    engine: &(impl SymbolTable + ?Sized),
    handle: RemoteHandle,
) -> Result<RemoteHandle> {
    let registered = engine.list(Scope::RegisteredSymbols)?;
    let mut handle = handle;
    for part in [StringsPart::Bytes, StringsPart::Offsets] {
        let part_name = naming::strings_part(handle.name(), part);
        if registered.contains(&part_name) {
            handle = handle.with_part(part, part_name);
        }
    }
    Ok(handle)
}

/// Exhaustive dispatch over the reply's type tag.
pub(crate) fn from_raw(raw: RawObject) -> Result<Attached> {
    let tag: TypeTag = raw.tag.parse()?;
    match tag {
        TypeTag::Plain | TypeTag::String | TypeTag::Categorical | TypeTag::SegArray => {
            handle_from_raw(tag, raw).map(Attached::Handle)
        }
        TypeTag::GroupedResult => grouped_from_raw(raw).map(Attached::Grouped),
        TypeTag::Tabular => table_from_raw(raw).map(Attached::Table),
    }
}

fn handle_from_raw(tag: TypeTag, raw: RawObject) -> Result<RemoteHandle> {
    let dtype = |raw: &RawObject| {
        raw.dtype.ok_or_else(|| {
            Error::TypeMismatch(format!("attach reply for '{}' carries no dtype", raw.name))
        })
    };
    let single = |raw: &RawObject| match raw.components.as_slice() {
        [one] => Ok(one.clone()),
        _ => Err(Error::TypeMismatch(format!(
            "'{}' should span exactly one symbol, reply lists {:?}",
            raw.name, raw.components
        ))),
    };
    match tag {
        TypeTag::Plain => Ok(RemoteHandle::array(single(&raw)?, dtype(&raw)?, raw.size)),
        TypeTag::String => Ok(RemoteHandle::strings(single(&raw)?, raw.size)),
        TypeTag::Categorical => Ok(RemoteHandle::composite(
            raw.name,
            ObjectKind::Categorical,
            DType::Categorical,
            raw.size,
            raw.components,
        )),
        TypeTag::SegArray => {
            let dtype = dtype(&raw)?;
            Ok(RemoteHandle::composite(
                raw.name,
                ObjectKind::SegArray,
                dtype,
                raw.size,
                raw.components,
            ))
        }
        TypeTag::GroupedResult | TypeTag::Tabular => Err(Error::TypeMismatch(format!(
            "'{}' is a {} object where an array was expected",
            raw.name, tag
        ))),
    }
}

/// A nested part: must itself be one of the array-like tags.
fn part_handle(part: RawPart) -> Result<RemoteHandle> {
    let tag: TypeTag = part.object.tag.parse()?;
    handle_from_raw(tag, part.object)
}

fn grouped_from_raw(raw: RawObject) -> Result<GroupedResult> {
    let mut keys = Vec::new();
    let mut unique_keys = Vec::new();
    let mut permutation = None;
    let mut segments = None;
    for part in raw.parts {
        let role = part.role.clone();
        match role.as_str() {
            naming::PERMUTATION => permutation = Some(part_handle(part)?),
            naming::SEGMENTS => segments = Some(part_handle(part)?),
            role if role.starts_with("unique_keys_") => unique_keys.push(part_handle(part)?),
            role if role.starts_with("keys_") => keys.push(part_handle(part)?),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "unexpected part '{}' in grouped result '{}'",
                    other, raw.name
                )))
            }
        }
    }
    let missing = |what: &str| {
        Error::TypeMismatch(format!("grouped result '{}' has no {}", raw.name, what))
    };
    let permutation = permutation.ok_or_else(|| missing(naming::PERMUTATION))?;
    let segments = segments.ok_or_else(|| missing(naming::SEGMENTS))?;
    GroupedResult::from_parts(raw.name.clone(), keys, permutation, segments, unique_keys)
}

fn table_from_raw(raw: RawObject) -> Result<Table> {
    let mut labels = None;
    let mut columns = Vec::new();
    let mut index = Vec::new();
    for part in raw.parts {
        let role = part.role.clone();
        match role.as_str() {
            naming::COLUMNS => labels = Some(part_handle(part)?),
            role if role.starts_with("col:") => {
                let label = role["col:".len()..].to_string();
                columns.push((label, part_handle(part)?));
            }
            role if role.starts_with("index_") => index.push(part_handle(part)?),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "unexpected part '{}' in table '{}'",
                    other, raw.name
                )))
            }
        }
    }
    let labels = labels.ok_or_else(|| {
        Error::TypeMismatch(format!("table '{}' has no column labels", raw.name))
    })?;
    Ok(Table::from_parts(raw.name, labels, columns, index))
}
