//! Register / unregister / is-registered and the administrative calls.
//!
//! The engine has no multi-name transactions. A multi-component mutation
//! that fails part way is reported as `Error::PartialUpdate` listing what
//! was already applied; nothing is rolled back.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use symtab_core::engine::{ArrayOps, SymbolTable};
use symtab_core::error::{Error, Result};
use symtab_core::handle::{RemoteHandle, StringsPart};
use symtab_core::naming;
use symtab_core::protocol::{DTypeHint, DeleteOutcome, Scope};

use crate::attach::attach;
use crate::registrable::Registrable;

/// Persist `obj` under `name`, returning it under its registered identity.
///
/// Each component `i` is registered as `obj.registered_names(name)[i]`.
/// Re-registering under a new name renames the existing server symbols.
/// A name already denoting a different object, of any kind, fails with
/// `NamingConflict` before anything is mutated.
pub fn register<T: Registrable>(
    engine: &(impl SymbolTable + ?Sized),
    obj: T,
    name: &str,
) -> Result<T> {
    naming::validate(name)?;
    let current = obj.component_names();
    let targets = obj.registered_names(name);
    if current.len() != targets.len() {
        return Err(Error::TypeMismatch(format!(
            "'{}' spans {} symbols but would register {}",
            obj.label(),
            current.len(),
            targets.len()
        )));
    }

    let existing = engine.list(Scope::AllSymbols)?;
    if let Some(taken) = conflicting_symbol(&existing, &current, &targets, name) {
        return Err(Error::NamingConflict { name: taken });
    }

    let label = obj.label();
    let mut completed = Vec::with_capacity(targets.len());
    for (cur, tgt) in current.iter().zip(&targets) {
        match engine.register(cur, tgt) {
            Ok(updated) => {
                debug!(object = %label, from = %cur, to = %updated, "registered component");
                completed.push(updated);
            }
            Err(e) => return Err(partial(&label, "register", tgt, completed, e)),
        }
    }
    Ok(obj.with_name(name))
}

/// Drop the registration of every component of `obj`.
///
/// The object stays usable until the next bulk clear.
pub fn unregister<T: Registrable>(engine: &(impl SymbolTable + ?Sized), obj: &T) -> Result<()> {
    let label = obj.label();
    let mut completed = Vec::new();
    for name in obj.component_names() {
        match engine.unregister(&name) {
            Ok(()) => {
                debug!(object = %label, component = %name, "unregistered component");
                completed.push(name);
            }
            Err(e) => return Err(partial(&label, "unregister", &name, completed, e)),
        }
    }
    Ok(())
}

/// Whether `obj` is registered, from a single registry query.
///
/// All required components registered gives `true`, none gives `false`.
/// Any disagreement is `Error::Inconsistent`.
pub fn is_registered<T: Registrable>(
    engine: &(impl SymbolTable + ?Sized),
    obj: &T,
) -> Result<bool> {
    let registry = engine.list(Scope::RegisteredSymbols)?;
    let (registered, unregistered): (Vec<String>, Vec<String>) = obj
        .required_names()
        .into_iter()
        .partition(|n| registry.contains(n));
    match (registered.is_empty(), unregistered.is_empty()) {
        (_, true) => Ok(true),
        (true, false) => Ok(false),
        (false, false) => {
            let object = obj.label();
            warn!(%object, ?registered, ?unregistered, "registration inconsistency");
            Err(Error::Inconsistent {
                object,
                registered,
                unregistered,
            })
        }
    }
}

/// Administrative unregister without a live handle. Returns the engine's message.
pub fn unregister_by_name(
    engine: &(impl SymbolTable + ?Sized),
    name: &str,
    hint: DTypeHint,
) -> Result<String> {
    let msg = engine.unregister_by_name(name, hint)?;
    debug!(name, %msg, "unregister by name");
    Ok(msg)
}

/// Names in the registry (registered symbols only).
pub fn list_registry(engine: &(impl SymbolTable + ?Sized)) -> Result<BTreeSet<String>> {
    engine.list(Scope::RegisteredSymbols)
}

/// Every live name in the symbol table.
pub fn list_symbol_table(engine: &(impl SymbolTable + ?Sized)) -> Result<BTreeSet<String>> {
    engine.list(Scope::AllSymbols)
}

/// Bulk clear: reclaim every unregistered symbol.
pub fn clear(engine: &(impl SymbolTable + ?Sized)) -> Result<()> {
    engine.clear()?;
    debug!("bulk clear");
    Ok(())
}

/// Delete the server state behind `obj`.
///
/// Refuses, without deleting anything, when any component is registered.
pub fn delete<T: Registrable>(
    engine: &(impl SymbolTable + ?Sized),
    obj: &T,
) -> Result<DeleteOutcome> {
    let registry = engine.list(Scope::RegisteredSymbols)?;
    let names = obj.component_names();
    if names.iter().any(|n| registry.contains(n)) {
        return Ok(DeleteOutcome::RegisteredNotDeleted);
    }
    let label = obj.label();
    let mut completed = Vec::new();
    for name in names {
        match engine.delete(&name) {
            Ok(DeleteOutcome::Deleted) => completed.push(name),
            Ok(DeleteOutcome::RegisteredNotDeleted) => return Ok(DeleteOutcome::RegisteredNotDeleted),
            Err(e) => return Err(partial(&label, "delete", &name, completed, e)),
        }
    }
    Ok(DeleteOutcome::Deleted)
}

/// Materialize the bytes or offsets array of a strings handle.
///
/// Returns the parent with the part recorded (so it registers and
/// unregisters along with it) and a handle to the part itself. A part the
/// parent already records is re-attached instead of recreated.
pub fn strings_part<E>(
    engine: &E,
    handle: RemoteHandle,
    part: StringsPart,
) -> Result<(RemoteHandle, RemoteHandle)>
where
    E: SymbolTable + ArrayOps + ?Sized,
{
    if let Some(existing) = handle.part(part) {
        let part_handle = attach(engine, existing, DTypeHint::Infer)?.into_handle()?;
        return Ok((handle, part_handle));
    }
    let part_handle = engine.strings_part(&handle, part)?;
    let parent = handle.with_part(part, part_handle.name());
    Ok((parent, part_handle))
}

/// The name that blocks registering as `name`: a target already held by a
/// symbol outside `current`, or `name` itself when another object
/// (of any kind) is already known by it.
fn conflicting_symbol(
    existing: &BTreeSet<String>,
    current: &[String],
    targets: &[String],
    name: &str,
) -> Option<String> {
    existing
        .iter()
        .filter(|sym| !current.contains(*sym))
        .find_map(|sym| {
            if targets.contains(sym) {
                Some(sym.clone())
            } else if naming::object_root(sym) == name || naming::strings_parent(sym) == Some(name) {
                Some(name.to_string())
            } else {
                None
            }
        })
}

fn partial(
    object: &str,
    operation: &'static str,
    failed: &str,
    completed: Vec<String>,
    source: Error,
) -> Error {
    if completed.is_empty() {
        return source;
    }
    warn!(object, operation, failed, ?completed, "partial update");
    Error::PartialUpdate {
        object: object.to_string(),
        operation,
        failed: failed.to_string(),
        completed,
        source: Box::new(source),
    }
}
