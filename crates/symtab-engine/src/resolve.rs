//! Name → object resolution behind `attach` and `unregister_by_name`.
//!
//! A name resolves as a plain symbol, a grouped result
//! (`<name>.permutation`), a table (`<name>.columns`), a categorical
//! (`<name>.codes` + `<name>.categories`) or a segmented array
//! (`<name>.segments` + `<name>.values`). Without a type hint, a name
//! matching more than one layout is rejected as ambiguous.

use symtab_core::dtype::DType;
use symtab_core::error::{RemoteError, Result};
use symtab_core::naming;
use symtab_core::protocol::{DTypeHint, RawObject, RawPart, TypeTag};

use crate::state::{EngineState, Stored};

pub fn resolve(state: &EngineState, name: &str, hint: DTypeHint) -> Result<RawObject> {
    let found = match hint {
        DTypeHint::Infer => {
            let mut candidates: Vec<RawObject> = [
                resolve_plain(state, name),
                resolve_grouped(state, name),
                resolve_table(state, name),
                resolve_categorical(state, name),
                resolve_segarray(state, name),
            ]
            .into_iter()
            .flatten()
            .collect();
            if candidates.len() > 1 {
                let tags: Vec<&str> = candidates.iter().map(|c| c.tag.as_str()).collect();
                return Err(RemoteError::Rejected(format!(
                    "'{}' is ambiguous: it resolves as {}; pass a type hint",
                    name,
                    tags.join(", ")
                ))
                .into());
            }
            candidates.pop()
        }
        DTypeHint::Tag(tag) => match tag {
            TypeTag::Plain | TypeTag::String => {
                resolve_plain(state, name).filter(|o| o.tag == tag.as_str())
            }
            TypeTag::Categorical => resolve_categorical(state, name),
            TypeTag::SegArray => resolve_segarray(state, name),
            TypeTag::GroupedResult => resolve_grouped(state, name),
            TypeTag::Tabular => resolve_table(state, name),
        },
    };
    found.ok_or_else(|| RemoteError::UnknownSymbol(name.to_string()).into())
}

/// Every server symbol an attached object spans, recursively.
pub fn symbol_names(obj: &RawObject) -> Vec<String> {
    let mut out = obj.components.clone();
    for part in &obj.parts {
        out.extend(symbol_names(&part.object));
    }
    out
}

fn raw(tag: TypeTag, name: &str, dtype: DType, size: usize, components: Vec<String>) -> RawObject {
    RawObject {
        tag: tag.as_str().to_string(),
        name: name.to_string(),
        dtype: Some(dtype),
        size,
        components,
        parts: Vec::new(),
    }
}

fn part(role: impl Into<String>, object: RawObject) -> RawPart {
    RawPart {
        role: role.into(),
        object,
    }
}

fn resolve_plain(state: &EngineState, name: &str) -> Option<RawObject> {
    let sym = state.symbols.get(name)?;
    let tag = match sym.data {
        Stored::Array { .. } => TypeTag::Plain,
        Stored::Strings { .. } => TypeTag::String,
    };
    Some(raw(tag, name, sym.data.dtype(), sym.data.len(), vec![name.to_string()]))
}

fn resolve_categorical(state: &EngineState, name: &str) -> Option<RawObject> {
    let codes = naming::component(name, naming::CODES);
    let cats = naming::component(name, naming::CATEGORIES);
    let size = match &state.symbols.get(&codes)?.data {
        Stored::Array { values, .. } => values.len(),
        Stored::Strings { .. } => return None,
    };
    match state.symbols.get(&cats)?.data {
        Stored::Strings { .. } => {}
        Stored::Array { .. } => return None,
    }
    Some(raw(TypeTag::Categorical, name, DType::Categorical, size, vec![codes, cats]))
}

fn resolve_segarray(state: &EngineState, name: &str) -> Option<RawObject> {
    let segments = naming::component(name, naming::SEGMENTS);
    let values = naming::component(name, naming::VALUES);
    let seg = state.symbols.get(&segments)?;
    let val = state.symbols.get(&values)?;
    Some(raw(
        TypeTag::SegArray,
        name,
        val.data.dtype(),
        seg.data.len(),
        vec![segments, values],
    ))
}

/// A column, key or level: anything with a flat layout.
fn resolve_value(state: &EngineState, name: &str) -> Option<RawObject> {
    resolve_plain(state, name)
        .or_else(|| resolve_categorical(state, name))
        .or_else(|| resolve_segarray(state, name))
}

fn resolve_grouped(state: &EngineState, name: &str) -> Option<RawObject> {
    let permutation = resolve_plain(
        state,
        &naming::component(name, naming::PERMUTATION),
    )?;
    let segments = resolve_plain(state, &naming::component(name, naming::SEGMENTS))?;

    let mut parts = Vec::new();
    let mut nkeys = 0;
    while let Some(key) = resolve_value(state, &naming::group_keys(name, nkeys)) {
        parts.push(part(format!("keys_{}", nkeys), key));
        nkeys += 1;
    }
    if nkeys == 0 {
        return None;
    }
    let size = permutation.size;
    parts.push(part(naming::PERMUTATION, permutation));
    parts.push(part(naming::SEGMENTS, segments));
    for i in 0..nkeys {
        let unique = resolve_value(state, &naming::group_unique_keys(name, i))?;
        parts.push(part(format!("unique_keys_{}", i), unique));
    }

    Some(RawObject {
        tag: TypeTag::GroupedResult.as_str().to_string(),
        name: name.to_string(),
        dtype: None,
        size,
        components: Vec::new(),
        parts,
    })
}

fn resolve_table(state: &EngineState, name: &str) -> Option<RawObject> {
    let columns_name = naming::component(name, naming::COLUMNS);
    let labels = match &state.symbols.get(&columns_name)?.data {
        Stored::Strings { values } => values.clone(),
        Stored::Array { .. } => return None,
    };
    let columns = resolve_plain(state, &columns_name)?;

    let mut parts = vec![part(naming::COLUMNS, columns)];
    let mut size = 0;
    for (i, label) in labels.iter().enumerate() {
        let col = resolve_value(state, &naming::table_column(name, i))?;
        size = col.size;
        parts.push(part(format!("col:{}", label), col));
    }
    let index_label = naming::table_index_label(name);
    let mut level = 0;
    while let Some(idx) = resolve_value(state, &naming::multi_index_key(&index_label, level)) {
        size = idx.size;
        parts.push(part(format!("index_{}", level), idx));
        level += 1;
    }

    Some(RawObject {
        tag: TypeTag::Tabular.as_str().to_string(),
        name: name.to_string(),
        dtype: None,
        size,
        components: Vec::new(),
        parts,
    })
}
