//! `SymbolTable` implementation for `MemoryEngine`.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use symtab_core::engine::SymbolTable;
use symtab_core::error::Result;
use symtab_core::handle::StringsPart;
use symtab_core::naming;
use symtab_core::protocol::{DTypeHint, DeleteOutcome, RawObject, Scope, TypeTag};

use crate::resolve::{resolve, symbol_names};
use crate::state::{rejected, MemoryEngine};

impl SymbolTable for MemoryEngine {
    fn attach(&self, name: &str, hint: DTypeHint) -> Result<RawObject> {
        let state = self.lock()?;
        let obj = resolve(&state, name, hint)?;
        trace!(name, tag = %obj.tag, "attach resolved");
        Ok(obj)
    }

    fn register(&self, name: &str, new_name: &str) -> Result<String> {
        let mut state = self.lock()?;
        state.get(name)?;
        if name != new_name {
            if state.contains(new_name) {
                return Err(rejected(format!("name '{}' is already in use", new_name)));
            }
            if let Some(sym) = state.symbols.remove(name) {
                state.symbols.insert(new_name.to_string(), sym);
            }
        }
        state.get_mut(new_name)?.registered = true;
        debug!(from = name, to = new_name, "registered symbol");
        Ok(new_name.to_string())
    }

    fn unregister(&self, name: &str) -> Result<()> {
        let mut state = self.lock()?;
        state.get_mut(name)?.registered = false;
        debug!(name, "unregistered symbol");
        Ok(())
    }

    fn list(&self, scope: Scope) -> Result<BTreeSet<String>> {
        let state = self.lock()?;
        Ok(state.names(scope == Scope::RegisteredSymbols))
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        let before = state.symbols.len();
        state.symbols.retain(|_, sym| sym.registered);
        debug!(removed = before - state.symbols.len(), "cleared unregistered symbols");
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        let mut state = self.lock()?;
        if state.get(name)?.registered {
            return Ok(DeleteOutcome::RegisteredNotDeleted);
        }
        state.symbols.remove(name);
        Ok(DeleteOutcome::Deleted)
    }

    fn unregister_by_name(&self, name: &str, hint: DTypeHint) -> Result<String> {
        let mut state = self.lock()?;
        let obj = resolve(&state, name, hint)?;
        let mut names = symbol_names(&obj);
        if obj.tag == TypeTag::String.as_str() {
            for part in [StringsPart::Bytes, StringsPart::Offsets] {
                let part_name = naming::strings_part(name, part);
                if state.contains(&part_name) {
                    names.push(part_name);
                }
            }
        }
        let mut count = 0;
        for n in &names {
            let sym = state.get_mut(n)?;
            if sym.registered {
                sym.registered = false;
                count += 1;
            }
        }
        debug!(name, count, "unregistered by name");
        Ok(format!(
            "unregistered {} of {} component(s) of '{}'",
            count,
            names.len(),
            name
        ))
    }
}
