//! Single-level index over one remote array.

use std::collections::BTreeMap;

use tracing::debug;

use symtab_core::dtype::{DType, ObjectKind, Semantic};
use symtab_core::engine::{ArrayOps, Engine, Operand, SymbolTable};
use symtab_core::error::{Error, Result};
use symtab_core::handle::RemoteHandle;
use symtab_core::naming;
use symtab_core::protocol::ExportSpec;
use symtab_core::scalar::Scalar;

use crate::callback::{Callback, CallbackRegistry};

/// Key for a membership lookup.
#[derive(Debug, Clone)]
pub enum LookupKey<'a> {
    /// A single value, lifted into a one-element array.
    Scalar(Scalar),
    /// A local set of values.
    Values(Vec<Scalar>),
    /// Values already on the engine.
    Handle(&'a RemoteHandle),
}

impl From<Scalar> for LookupKey<'_> {
    fn from(s: Scalar) -> Self {
        LookupKey::Scalar(s)
    }
}

impl From<i64> for LookupKey<'_> {
    fn from(v: i64) -> Self {
        LookupKey::Scalar(Scalar::I64(v))
    }
}

impl From<&str> for LookupKey<'_> {
    fn from(v: &str) -> Self {
        LookupKey::Scalar(Scalar::from(v))
    }
}

impl From<Vec<Scalar>> for LookupKey<'_> {
    fn from(v: Vec<Scalar>) -> Self {
        LookupKey::Values(v)
    }
}

impl<'a> From<&'a RemoteHandle> for LookupKey<'a> {
    fn from(h: &'a RemoteHandle) -> Self {
        LookupKey::Handle(h)
    }
}

impl LookupKey<'_> {
    /// The key as an engine array; local values are uploaded.
    pub(crate) fn lift(self, engine: &(impl ArrayOps + ?Sized)) -> Result<RemoteHandle> {
        match self {
            LookupKey::Scalar(s) => engine.create(vec![s]),
            LookupKey::Values(v) => engine.create(v),
            LookupKey::Handle(h) => Ok(h.clone()),
        }
    }
}

/// Reject layouts an index cannot order or compare element-wise.
pub(crate) fn check_level(values: &RemoteHandle) -> Result<()> {
    if values.kind() == ObjectKind::SegArray {
        return Err(Error::TypeMismatch(format!(
            "cannot index by segmented array {}",
            values
        )));
    }
    Ok(())
}

/// Same layout, element type and semantic wrapper.
pub(crate) fn same_type(a: &RemoteHandle, b: &RemoteHandle) -> bool {
    a.kind() == b.kind() && a.dtype() == b.dtype() && a.semantic() == b.semantic()
}

/// Descending order as the exact reverse of `ascending`.
pub(crate) fn reversed(
    engine: &(impl ArrayOps + ?Sized),
    ascending: &RemoteHandle,
) -> Result<RemoteHandle> {
    let n = ascending.size() as i64;
    let rev = engine.arange(n - 1, -1, -1)?;
    engine.take(ascending, &rev)
}

#[derive(Debug, Clone)]
pub struct Index {
    values: RemoteHandle,
    name: Option<String>,
    callback: Callback,
}

impl Index {
    /// Wrap `values`, resolving the restoration callback from its semantic.
    pub fn new(values: RemoteHandle) -> Result<Self> {
        Self::with_callbacks(values, &CallbackRegistry::default())
    }

    pub fn with_callbacks(values: RemoteHandle, callbacks: &CallbackRegistry) -> Result<Self> {
        check_level(&values)?;
        let callback = callbacks.resolve(values.semantic())?;
        Ok(Self {
            values,
            name: None,
            callback,
        })
    }

    /// Upload local values and index them.
    pub fn from_scalars(engine: &(impl ArrayOps + ?Sized), values: Vec<Scalar>) -> Result<Self> {
        Self::new(engine.create(values)?)
    }

    fn derived(&self, values: RemoteHandle) -> Self {
        Self {
            values: self.callback.apply(values),
            name: self.name.clone(),
            callback: self.callback.clone(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn values(&self) -> &RemoteHandle {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.size()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub fn semantic(&self) -> &Semantic {
        self.values.semantic()
    }

    /// Re-wrap the values as `semantic` and re-resolve the callback.
    pub fn set_semantic(self, semantic: Semantic, callbacks: &CallbackRegistry) -> Result<Self> {
        let callback = callbacks.resolve(&semantic)?;
        Ok(Self {
            values: self.values.with_semantic(semantic),
            name: self.name,
            callback,
        })
    }

    /// Sort permutation of the values.
    ///
    /// Descending order negates the values before sorting when negation
    /// preserves their order, and otherwise reverses the ascending permutation.
    pub fn argsort(&self, engine: &(impl ArrayOps + ?Sized), ascending: bool) -> Result<RemoteHandle> {
        if ascending {
            return engine.argsort(&self.values);
        }
        if self.negation_reverses_order(engine)? {
            let negated = engine.negate(&self.values)?;
            return engine.argsort(&negated);
        }
        let asc = engine.argsort(&self.values)?;
        reversed(engine, &asc)
    }

    /// Float64 always qualifies; Int64 only without `i64::MIN`, which has no negation.
    fn negation_reverses_order(&self, engine: &(impl ArrayOps + ?Sized)) -> Result<bool> {
        if self.values.kind() != ObjectKind::Array {
            return Ok(false);
        }
        match self.dtype() {
            DType::Float64 => Ok(true),
            DType::Int64 => {
                let at_min = engine.compare_eq(&self.values, Operand::Scalar(Scalar::I64(i64::MIN)))?;
                Ok(engine.count_true(&at_min)? == 0)
            }
            _ => Ok(false),
        }
    }

    fn check_mergeable(&self, other: &Index) -> Result<()> {
        if !same_type(&self.values, &other.values) {
            return Err(Error::TypeMismatch(format!(
                "cannot merge index of {} with index of {}",
                self.values, other.values
            )));
        }
        Ok(())
    }

    /// Deduplicated union. Output order is unspecified.
    pub fn merge(&self, engine: &(impl ArrayOps + ?Sized), other: &Index) -> Result<Index> {
        self.merge_all(engine, std::slice::from_ref(other))
    }

    /// Deduplicated union of `self` and every index in `others`.
    pub fn merge_all(&self, engine: &(impl ArrayOps + ?Sized), others: &[Index]) -> Result<Index> {
        for other in others {
            self.check_mergeable(other)?;
        }
        let parts: Vec<&RemoteHandle> = std::iter::once(&self.values)
            .chain(others.iter().map(|o| &o.values))
            .collect();
        let combined = engine.concat(&parts, false)?;
        let grouping = engine.group_by(&[&combined])?;
        let unique = grouping
            .unique_keys
            .into_iter()
            .next()
            .ok_or_else(|| Error::TypeMismatch("grouping returned no key arrays".into()))?;
        debug!(inputs = parts.len(), unique = unique.size(), "index merge");
        Ok(self.derived(unique))
    }

    /// Ordered concatenation keeping duplicates.
    pub fn concat(&self, engine: &(impl ArrayOps + ?Sized), other: &Index) -> Result<Index> {
        self.check_mergeable(other)?;
        let joined = engine.concat(&[&self.values, &other.values], true)?;
        Ok(self.derived(joined))
    }

    /// True iff both have equal length and equal elements position by position.
    pub fn check_aligned(&self, engine: &(impl ArrayOps + ?Sized), other: &Index) -> Result<bool> {
        if self.size() != other.size() {
            return Ok(false);
        }
        let mask = engine.compare_eq(&self.values, Operand::Handle(&other.values))?;
        Ok(engine.count_true(&mask)? == self.size())
    }

    /// Boolean mask of the positions whose value is in `key`.
    pub fn lookup<'k>(
        &self,
        engine: &(impl ArrayOps + ?Sized),
        key: impl Into<LookupKey<'k>>,
    ) -> Result<RemoteHandle> {
        let key = key.into().lift(engine)?;
        engine.in1d(&[&self.values], &[&key])
    }

    /// Element-wise positional comparison.
    pub fn eq(&self, engine: &(impl ArrayOps + ?Sized), other: Operand<'_>) -> Result<RemoteHandle> {
        engine.compare_eq(&self.values, other)
    }

    pub fn is_unique(&self, engine: &(impl ArrayOps + ?Sized)) -> Result<bool> {
        let grouping = engine.group_by(&[&self.values])?;
        Ok(grouping.num_groups() == self.size())
    }

    /// Positional selection.
    pub fn take(&self, engine: &(impl ArrayOps + ?Sized), perm: &RemoteHandle) -> Result<Index> {
        let taken = engine.take(&self.values, perm)?;
        Ok(self.derived(taken))
    }

    pub fn to_list(&self, engine: &(impl ArrayOps + ?Sized)) -> Result<Vec<Scalar>> {
        engine.fetch(&self.values)
    }

    /// The values keyed by `label`, `idx` when none is given.
    pub fn to_dict(&self, label: Option<&str>) -> BTreeMap<String, RemoteHandle> {
        let mut out = BTreeMap::new();
        out.insert(label.unwrap_or("idx").to_string(), self.values.clone());
        out
    }

    /// Register the values as `<label>_key`.
    pub fn register(self, engine: &(impl SymbolTable + ?Sized), label: &str) -> Result<Index> {
        naming::validate(label)?;
        let values = symtab_registry::register(engine, self.values, &naming::index_key(label))?;
        Ok(Self { values, ..self })
    }

    pub fn unregister(&self, engine: &(impl SymbolTable + ?Sized)) -> Result<()> {
        symtab_registry::unregister(engine, &self.values)
    }

    pub fn is_registered(&self, engine: &(impl SymbolTable + ?Sized)) -> Result<bool> {
        symtab_registry::is_registered(engine, &self.values)
    }

    pub fn export(&self, engine: &(impl Engine + ?Sized), spec: &ExportSpec) -> Result<String> {
        engine.export(&self.values, spec)
    }
}
