//! Prefix-based bulk registration and attach.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use tracing::{debug, info};

use symtab_core::engine::SymbolTable;
use symtab_core::error::{Error, Result};
use symtab_core::naming;
use symtab_core::protocol::{DTypeHint, DeleteOutcome};

use crate::attach::{attach, Attached};
use crate::protocol::{list_registry, register, unregister};
use crate::registrable::Registrable;

/// A keyed or positional collection of registrable objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection<T> {
    Map(BTreeMap<String, T>),
    Seq(Vec<T>),
}

impl<T> Collection<T> {
    pub fn len(&self) -> usize {
        match self {
            Collection::Map(m) => m.len(),
            Collection::Seq(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(key, item)` pairs; sequence keys are positions.
    fn keyed(&self) -> Vec<(String, &T)> {
        match self {
            Collection::Map(m) => m.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Collection::Seq(v) => v.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        }
    }
}

/// Register every element as `<prefix><sanitized key>`.
///
/// With `overwrite`, an object a previous run registered under the same
/// key is unregistered first. Its symbols are deleted only where they
/// hold the new target name itself (the name cannot denote two objects);
/// objects under other keys are left untouched.
pub fn register_all<T: Registrable>(
    engine: &(impl SymbolTable + ?Sized),
    collection: Collection<T>,
    prefix: &str,
    overwrite: bool,
) -> Result<Collection<T>> {
    let target = |key: &str| format!("{}{}", prefix, naming::sanitize(key));
    if overwrite {
        let keyed = collection.keyed();
        let keep: HashSet<String> = keyed
            .iter()
            .flat_map(|(_, item)| item.component_names())
            .collect();
        let mut previous = attach_all(engine, prefix)?;
        for (key, _) in &keyed {
            let Some(old) = previous.remove(&naming::sanitize(key)) else {
                continue;
            };
            unregister(engine, &old)?;
            debug!(name = %old.name(), key = %key, "unregistered previous run");
            if old.name() != target(key) {
                continue;
            }
            for name in old.component_names() {
                if keep.contains(&name) {
                    continue;
                }
                if let DeleteOutcome::RegisteredNotDeleted = engine.delete(&name)? {
                    return Err(Error::NamingConflict { name });
                }
            }
        }
    }

    let out = match collection {
        Collection::Map(m) => Collection::Map(
            m.into_iter()
                .map(|(k, v)| {
                    let name = target(&k);
                    register(engine, v, &name).map(|v| (k, v))
                })
                .collect::<Result<_>>()?,
        ),
        Collection::Seq(v) => Collection::Seq(
            v.into_iter()
                .enumerate()
                .map(|(i, v)| register(engine, v, &target(&i.to_string())))
                .collect::<Result<_>>()?,
        ),
    };
    info!(prefix, count = out.len(), "registered collection");
    Ok(out)
}

/// Attach every registered object whose name matches
/// `[<digits>_]<prefix><suffix>`, keyed by suffix.
pub fn attach_all(
    engine: &(impl SymbolTable + ?Sized),
    prefix: &str,
) -> Result<BTreeMap<String, Attached>> {
    let pattern = Regex::new(&format!(r"^(?:\d+_)?{}(\S+)$", regex::escape(prefix)))
        .map_err(|_| Error::InvalidName {
            name: prefix.to_string(),
            reason: "prefix does not form a valid name pattern",
        })?;

    // One entry per logical object: component names collapse onto their root.
    let mut roots: BTreeMap<String, String> = BTreeMap::new();
    for name in list_registry(engine)? {
        let root = naming::object_root(&name);
        if let Some(caps) = pattern.captures(root) {
            if let Some(suffix) = caps.get(1) {
                roots.insert(root.to_string(), suffix.as_str().to_string());
            }
        }
    }
    let mut out = BTreeMap::new();
    for (root, suffix) in &roots {
        // Strings parts come back with their parent.
        if naming::strings_parent(root).is_some_and(|p| roots.contains_key(p)) {
            continue;
        }
        let attached = attach(engine, root, DTypeHint::Infer)?;
        debug!(name = %root, key = %suffix, "attached by prefix");
        out.insert(suffix.clone(), attached);
    }
    Ok(out)
}

/// Unregister everything `attach_all(prefix)` finds. Returns the keys dropped.
pub fn unregister_all(engine: &(impl SymbolTable + ?Sized), prefix: &str) -> Result<Vec<String>> {
    let found = attach_all(engine, prefix)?;
    let mut keys = Vec::with_capacity(found.len());
    for (key, obj) in found {
        unregister(engine, &obj)?;
        keys.push(key);
    }
    Ok(keys)
}
