//! Type restoration after generic set operations.
//!
//! Merge and concat work on raw values and hand back plain arrays. The
//! semantic wrapper of the input is looked up here once, when the index is
//! built, and re-applied to every output.

use std::collections::HashMap;
use std::fmt;

use symtab_core::dtype::{Semantic, SemanticKind};
use symtab_core::error::{Error, Result};
use symtab_core::handle::RemoteHandle;

/// Rebuild a wrapped array from a raw result and the input's semantic.
pub type Restore = fn(RemoteHandle, &Semantic) -> RemoteHandle;

fn restore_plain(raw: RemoteHandle, _: &Semantic) -> RemoteHandle {
    raw.with_semantic(Semantic::Plain)
}

fn rewrap(raw: RemoteHandle, semantic: &Semantic) -> RemoteHandle {
    raw.with_semantic(semantic.clone())
}

/// Semantic kind → reconstruction function.
pub struct CallbackRegistry {
    restorers: HashMap<SemanticKind, Restore>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        let mut r = Self {
            restorers: HashMap::new(),
        };
        r.register(SemanticKind::Plain, restore_plain);
        r.register(SemanticKind::Datetime, rewrap);
        r.register(SemanticKind::Timedelta, rewrap);
        r.register(SemanticKind::Ipv4, rewrap);
        r.register(SemanticKind::BitVector, rewrap);
        r
    }

    /// Registry with no entries; every kind must be registered explicitly.
    pub fn empty() -> Self {
        Self {
            restorers: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: SemanticKind, f: Restore) {
        self.restorers.insert(kind, f);
    }

    /// The callback for inputs wrapped as `semantic`.
    pub fn resolve(&self, semantic: &Semantic) -> Result<Callback> {
        let restore = self.restorers.get(&semantic.kind()).copied().ok_or_else(|| {
            Error::TypeMismatch(format!(
                "no restoration callback registered for {:?}",
                semantic.kind()
            ))
        })?;
        Ok(Callback {
            semantic: semantic.clone(),
            restore,
        })
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<String> = self.restorers.keys().map(|k| format!("{:?}", k)).collect();
        kinds.sort();
        f.debug_struct("CallbackRegistry").field("kinds", &kinds).finish()
    }
}

/// A resolved restoration: the input's semantic plus its reconstruction function.
#[derive(Clone)]
pub struct Callback {
    semantic: Semantic,
    restore: Restore,
}

impl Callback {
    pub fn semantic(&self) -> &Semantic {
        &self.semantic
    }

    pub fn apply(&self, raw: RemoteHandle) -> RemoteHandle {
        (self.restore)(raw, &self.semantic)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("semantic", &self.semantic)
            .finish_non_exhaustive()
    }
}
