//! Symbol storage and the value-level helpers shared by the kernels.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use symtab_core::config::ClientConfig;
use symtab_core::dtype::{DType, ObjectKind};
use symtab_core::error::{Error, RemoteError, Result};
use symtab_core::handle::RemoteHandle;
use symtab_core::scalar::Scalar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stored {
    Array { dtype: DType, values: Vec<Scalar> },
    Strings { values: Vec<String> },
}

impl Stored {
    pub fn len(&self) -> usize {
        match self {
            Stored::Array { values, .. } => values.len(),
            Stored::Strings { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            Stored::Array { dtype, .. } => *dtype,
            Stored::Strings { .. } => DType::Str,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub data: Stored,
    pub registered: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub symbols: BTreeMap<String, Symbol>,
    pub next_id: u64,
}

impl EngineState {
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&Symbol> {
        self.symbols
            .get(name)
            .ok_or_else(|| RemoteError::UnknownSymbol(name.to_string()).into())
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Symbol> {
        self.symbols
            .get_mut(name)
            .ok_or_else(|| RemoteError::UnknownSymbol(name.to_string()).into())
    }

    pub fn names(&self, registered_only: bool) -> BTreeSet<String> {
        self.symbols
            .iter()
            .filter(|(_, s)| !registered_only || s.registered)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// A transient name not currently in the table.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("{}{}", prefix, self.next_id);
            self.next_id += 1;
            if !self.contains(&name) {
                return name;
            }
        }
    }

    pub fn insert(&mut self, name: String, data: Stored, registered: bool) {
        self.symbols.insert(name, Symbol { data, registered });
    }

    /// Flat element view of a handle; categoricals are decoded.
    pub fn values_of(&self, handle: &RemoteHandle) -> Result<Vec<Scalar>> {
        let comps = handle.component_names();
        match handle.kind() {
            ObjectKind::Array | ObjectKind::Strings => {
                let first = comps
                    .first()
                    .ok_or_else(|| rejected(format!("handle '{}' has no components", handle.name())))?;
                Ok(stored_values(&self.get(first)?.data))
            }
            ObjectKind::Categorical => {
                let [codes, categories] = comps else {
                    return Err(rejected(format!(
                        "categorical '{}' must have 2 components",
                        handle.name()
                    )));
                };
                let codes = stored_values(&self.get(codes)?.data);
                let categories = match &self.get(categories)?.data {
                    Stored::Strings { values } => values,
                    Stored::Array { .. } => {
                        return Err(rejected(format!("'{}' is not a strings symbol", categories)))
                    }
                };
                codes
                    .iter()
                    .map(|c| {
                        c.as_i64()
                            .and_then(|i| usize::try_from(i).ok())
                            .and_then(|i| categories.get(i))
                            .map(|s| Scalar::Str(s.clone()))
                            .ok_or_else(|| rejected(format!("code {} out of range", c)))
                    })
                    .collect()
            }
            ObjectKind::SegArray => Err(Error::TypeMismatch(format!(
                "segmented array '{}' has no flat element view",
                handle.name()
            ))),
        }
    }

    /// Store `values` as a new transient object laid out like `kind`.
    pub fn store(
        &mut self,
        prefix: &str,
        kind: ObjectKind,
        dtype: DType,
        values: Vec<Scalar>,
    ) -> Result<RemoteHandle> {
        let size = values.len();
        match kind {
            ObjectKind::Array => {
                let name = self.fresh_name(prefix);
                self.insert(name.clone(), Stored::Array { dtype, values }, false);
                Ok(RemoteHandle::array(name, dtype, size))
            }
            ObjectKind::Strings => {
                let values = into_strings(values)?;
                let name = self.fresh_name(prefix);
                self.insert(name.clone(), Stored::Strings { values }, false);
                Ok(RemoteHandle::strings(name, size))
            }
            ObjectKind::Categorical => {
                let values = into_strings(values)?;
                let categories: Vec<String> = values
                    .iter()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let codes = values
                    .iter()
                    .map(|v| {
                        let pos = categories.binary_search(v).unwrap_or_default();
                        Scalar::I64(pos as i64)
                    })
                    .collect();
                let parent = self.fresh_name(prefix);
                let codes_name = self.fresh_name(prefix);
                let cats_name = self.fresh_name(prefix);
                self.insert(
                    codes_name.clone(),
                    Stored::Array {
                        dtype: DType::Int64,
                        values: codes,
                    },
                    false,
                );
                self.insert(cats_name.clone(), Stored::Strings { values: categories }, false);
                Ok(RemoteHandle::composite(
                    parent,
                    ObjectKind::Categorical,
                    DType::Categorical,
                    size,
                    vec![codes_name, cats_name],
                ))
            }
            ObjectKind::SegArray => Err(Error::TypeMismatch(
                "segmented arrays are built from segments + values".into(),
            )),
        }
    }

    /// Store `values` laid out like `like` (same kind and dtype).
    pub fn store_like(
        &mut self,
        prefix: &str,
        like: &RemoteHandle,
        values: Vec<Scalar>,
    ) -> Result<RemoteHandle> {
        self.store(prefix, like.kind(), like.dtype(), values)
    }
}

fn stored_values(data: &Stored) -> Vec<Scalar> {
    match data {
        Stored::Array { values, .. } => values.clone(),
        Stored::Strings { values } => values.iter().cloned().map(Scalar::Str).collect(),
    }
}

fn into_strings(values: Vec<Scalar>) -> Result<Vec<String>> {
    values
        .into_iter()
        .map(|v| match v {
            Scalar::Str(s) => Ok(s),
            other => Err(Error::TypeMismatch(format!(
                "expected string values, found {}",
                other.dtype()
            ))),
        })
        .collect()
}

pub(crate) fn rejected(msg: impl Into<String>) -> Error {
    RemoteError::Rejected(msg.into()).into()
}

/// Uniform dtype of a value list; empty lists default to int64.
pub fn infer_dtype(values: &[Scalar]) -> Result<DType> {
    let Some(first) = values.first() else {
        return Ok(DType::Int64);
    };
    let dtype = first.dtype();
    if let Some(other) = values.iter().find(|v| v.dtype() != dtype) {
        return Err(Error::TypeMismatch(format!(
            "mixed element types: {} and {}",
            dtype,
            other.dtype()
        )));
    }
    Ok(dtype)
}

/// In-memory engine. Single process, interior mutability through a mutex.
#[derive(Debug)]
pub struct MemoryEngine {
    pub(crate) cfg: ClientConfig,
    pub(crate) state: Mutex<EngineState>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl MemoryEngine {
    pub fn new(cfg: ClientConfig) -> Self {
        Self::with_state(cfg, EngineState::default())
    }

    pub fn with_state(cfg: ClientConfig, state: EngineState) -> Self {
        Self {
            cfg,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|_| rejected("engine state lock poisoned"))
    }

    /// Copy of the current state (for snapshots and inspection).
    pub fn state(&self) -> Result<EngineState> {
        Ok(self.lock()?.clone())
    }

    pub fn is_symbol_registered(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.get(name)?.registered)
    }
}
