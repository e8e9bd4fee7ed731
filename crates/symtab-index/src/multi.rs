//! Multi-level index: a tuple of aligned remote arrays.
//!
//! Ordering, deduplication and uniqueness always treat the levels jointly
//! as one composite key, level 0 most significant.

use std::collections::BTreeMap;

use tracing::debug;

use symtab_core::engine::{ArrayOps, Engine, Operand, SymbolTable};
use symtab_core::error::{Error, Result};
use symtab_core::handle::RemoteHandle;
use symtab_core::naming;
use symtab_core::protocol::{ExportSpec, FileFormat, WriteMode};
use symtab_core::scalar::Scalar;
use symtab_registry::Registrable;

use crate::callback::{Callback, CallbackRegistry};
use crate::index::{check_level, reversed, same_type, LookupKey};

/// Right-hand side of a MultiIndex equality test.
#[derive(Debug, Clone)]
pub enum Comparand<'a> {
    /// Rejected: a single value does not broadcast against a tuple of levels.
    Scalar(Scalar),
    /// One operand per level.
    Levels(Vec<Operand<'a>>),
    Multi(&'a MultiIndex),
}

impl From<Scalar> for Comparand<'_> {
    fn from(s: Scalar) -> Self {
        Comparand::Scalar(s)
    }
}

impl<'a> From<&'a MultiIndex> for Comparand<'a> {
    fn from(m: &'a MultiIndex) -> Self {
        Comparand::Multi(m)
    }
}

impl<'a> From<Vec<Operand<'a>>> for Comparand<'a> {
    fn from(levels: Vec<Operand<'a>>) -> Self {
        Comparand::Levels(levels)
    }
}

#[derive(Debug, Clone)]
pub struct MultiIndex {
    levels: Vec<RemoteHandle>,
    name: Option<String>,
    callbacks: Vec<Callback>,
}

impl MultiIndex {
    pub fn new(levels: Vec<RemoteHandle>) -> Result<Self> {
        Self::with_callbacks(levels, &CallbackRegistry::default())
    }

    pub fn with_callbacks(levels: Vec<RemoteHandle>, callbacks: &CallbackRegistry) -> Result<Self> {
        let first = levels
            .first()
            .ok_or_else(|| Error::TypeMismatch("a multi-index needs at least one level".into()))?;
        let size = first.size();
        for level in &levels {
            check_level(level)?;
            if level.size() != size {
                return Err(Error::TypeMismatch(format!(
                    "multi-index levels must share size {}, found {}",
                    size, level
                )));
            }
        }
        let callbacks = levels
            .iter()
            .map(|l| callbacks.resolve(l.semantic()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            levels,
            name: None,
            callbacks,
        })
    }

    /// Upload one local column per level.
    pub fn from_scalars(
        engine: &(impl ArrayOps + ?Sized),
        columns: Vec<Vec<Scalar>>,
    ) -> Result<Self> {
        let levels = columns
            .into_iter()
            .map(|c| engine.create(c))
            .collect::<Result<Vec<_>>>()?;
        Self::new(levels)
    }

    fn derived(&self, raw: Vec<RemoteHandle>) -> Self {
        Self {
            levels: raw
                .into_iter()
                .zip(&self.callbacks)
                .map(|(h, cb)| cb.apply(h))
                .collect(),
            name: self.name.clone(),
            callbacks: self.callbacks.clone(),
        }
    }

    fn level_refs(&self) -> Vec<&RemoteHandle> {
        self.levels.iter().collect()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn levels(&self) -> &[RemoteHandle] {
        &self.levels
    }

    /// Number of levels.
    pub fn nlevels(&self) -> usize {
        self.levels.len()
    }

    pub fn size(&self) -> usize {
        self.levels[0].size()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Lexicographic sort permutation; descending is the exact reverse.
    pub fn argsort(&self, engine: &(impl ArrayOps + ?Sized), ascending: bool) -> Result<RemoteHandle> {
        let asc = engine.coargsort(&self.level_refs())?;
        if ascending {
            Ok(asc)
        } else {
            reversed(engine, &asc)
        }
    }

    fn check_mergeable(&self, other: &MultiIndex) -> Result<()> {
        if self.nlevels() != other.nlevels() {
            return Err(Error::TypeMismatch(format!(
                "cannot combine a {}-level index with a {}-level index",
                self.nlevels(),
                other.nlevels()
            )));
        }
        if let Some((a, b)) = self
            .levels
            .iter()
            .zip(&other.levels)
            .find(|(a, b)| !same_type(a, b))
        {
            return Err(Error::TypeMismatch(format!(
                "level types differ: {} vs {}",
                a, b
            )));
        }
        Ok(())
    }

    /// Per-level concatenation of `self` then `others`, keeping rows aligned.
    fn concat_levels(
        &self,
        engine: &(impl ArrayOps + ?Sized),
        others: &[&MultiIndex],
    ) -> Result<Vec<RemoteHandle>> {
        (0..self.nlevels())
            .map(|i| {
                let parts: Vec<&RemoteHandle> = std::iter::once(&self.levels[i])
                    .chain(others.iter().map(|o| &o.levels[i]))
                    .collect();
                engine.concat(&parts, true)
            })
            .collect()
    }

    /// Deduplicated union over the full key tuple. Output order is unspecified.
    pub fn merge(&self, engine: &(impl ArrayOps + ?Sized), other: &MultiIndex) -> Result<MultiIndex> {
        self.merge_all(engine, std::slice::from_ref(other))
    }

    pub fn merge_all(
        &self,
        engine: &(impl ArrayOps + ?Sized),
        others: &[MultiIndex],
    ) -> Result<MultiIndex> {
        for other in others {
            self.check_mergeable(other)?;
        }
        let others: Vec<&MultiIndex> = others.iter().collect();
        let combined = self.concat_levels(engine, &others)?;
        let refs: Vec<&RemoteHandle> = combined.iter().collect();
        let grouping = engine.group_by(&refs)?;
        debug!(
            levels = self.nlevels(),
            inputs = others.len() + 1,
            unique = grouping.num_groups(),
            "multi-index merge"
        );
        Ok(self.derived(grouping.unique_keys))
    }

    /// Ordered concatenation keeping duplicates.
    pub fn concat(&self, engine: &(impl ArrayOps + ?Sized), other: &MultiIndex) -> Result<MultiIndex> {
        self.check_mergeable(other)?;
        let joined = self.concat_levels(engine, &[other])?;
        Ok(self.derived(joined))
    }

    pub fn check_aligned(
        &self,
        engine: &(impl ArrayOps + ?Sized),
        other: &MultiIndex,
    ) -> Result<bool> {
        if self.nlevels() != other.nlevels() || self.size() != other.size() {
            return Ok(false);
        }
        let mask = self.eq(engine, Comparand::Multi(other))?;
        Ok(engine.count_true(&mask)? == self.size())
    }

    /// Boolean mask of rows whose tuple appears in `key`, one key per level.
    pub fn lookup(
        &self,
        engine: &(impl ArrayOps + ?Sized),
        key: Vec<LookupKey<'_>>,
    ) -> Result<RemoteHandle> {
        if key.len() != self.nlevels() {
            return Err(Error::TypeMismatch(format!(
                "lookup key has {} value(s) but the index has {} level(s)",
                key.len(),
                self.nlevels()
            )));
        }
        let keys = key
            .into_iter()
            .map(|k| k.lift(engine))
            .collect::<Result<Vec<_>>>()?;
        let key_refs: Vec<&RemoteHandle> = keys.iter().collect();
        engine.in1d(&self.level_refs(), &key_refs)
    }

    /// Row-wise equality: AND of the per-level positional comparisons.
    pub fn eq(&self, engine: &(impl ArrayOps + ?Sized), other: Comparand<'_>) -> Result<RemoteHandle> {
        let operands = match other {
            Comparand::Scalar(s) => {
                return Err(Error::TypeMismatch(format!(
                    "cannot compare a {}-level index with scalar {}",
                    self.nlevels(),
                    s
                )))
            }
            Comparand::Levels(ops) => ops,
            Comparand::Multi(m) => m.levels.iter().map(Operand::Handle).collect(),
        };
        if operands.len() != self.nlevels() {
            return Err(Error::TypeMismatch(format!(
                "comparison has {} operand(s) but the index has {} level(s)",
                operands.len(),
                self.nlevels()
            )));
        }
        let mut acc: Option<RemoteHandle> = None;
        for (level, op) in self.levels.iter().zip(operands) {
            let mask = engine.compare_eq(level, op)?;
            acc = Some(match acc {
                None => mask,
                Some(prev) => engine.and(&prev, &mask)?,
            });
        }
        acc.ok_or_else(|| Error::TypeMismatch("a multi-index needs at least one level".into()))
    }

    pub fn is_unique(&self, engine: &(impl ArrayOps + ?Sized)) -> Result<bool> {
        let grouping = engine.group_by(&self.level_refs())?;
        Ok(grouping.num_groups() == self.size())
    }

    pub fn take(&self, engine: &(impl ArrayOps + ?Sized), perm: &RemoteHandle) -> Result<MultiIndex> {
        let taken = self
            .levels
            .iter()
            .map(|l| engine.take(l, perm))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.derived(taken))
    }

    /// Rows as tuples.
    pub fn to_list(&self, engine: &(impl ArrayOps + ?Sized)) -> Result<Vec<Vec<Scalar>>> {
        let columns = self
            .levels
            .iter()
            .map(|l| engine.fetch(l))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.size())
            .map(|r| columns.iter().map(|c| c[r].clone()).collect())
            .collect())
    }

    /// Levels keyed by `labels`, `idx_<i>` when none are given.
    pub fn to_dict(&self, labels: Option<&[&str]>) -> Result<BTreeMap<String, RemoteHandle>> {
        let names: Vec<String> = match labels {
            Some(labels) if labels.len() != self.nlevels() => {
                return Err(Error::TypeMismatch(format!(
                    "{} label(s) for a {}-level index",
                    labels.len(),
                    self.nlevels()
                )))
            }
            Some(labels) => labels.iter().map(|l| l.to_string()).collect(),
            None => (0..self.nlevels()).map(|i| format!("idx_{}", i)).collect(),
        };
        Ok(names.into_iter().zip(self.levels.iter().cloned()).collect())
    }

    /// Register level `i` as `<label>_key_<i>`.
    pub fn register(self, engine: &(impl SymbolTable + ?Sized), label: &str) -> Result<MultiIndex> {
        symtab_registry::register(engine, self, label)
    }

    pub fn unregister(&self, engine: &(impl SymbolTable + ?Sized)) -> Result<()> {
        symtab_registry::unregister(engine, self)
    }

    pub fn is_registered(&self, engine: &(impl SymbolTable + ?Sized)) -> Result<bool> {
        symtab_registry::is_registered(engine, self)
    }

    /// Export level `i` as dataset `<dataset>_<i>` into the same files.
    ///
    /// Levels after the first are appended, so multi-level exports need the
    /// columnar format.
    pub fn export(&self, engine: &(impl Engine + ?Sized), spec: &ExportSpec) -> Result<String> {
        if self.nlevels() > 1 && spec.format != FileFormat::Columnar {
            return Err(Error::TypeMismatch(
                "multi-level export needs the columnar format".into(),
            ));
        }
        let mut messages = Vec::with_capacity(self.nlevels());
        for (i, level) in self.levels.iter().enumerate() {
            let mut level_spec = spec.with_dataset(format!("{}_{}", spec.dataset, i));
            if i > 0 {
                level_spec.mode = WriteMode::Append;
            }
            messages.push(engine.export(level, &level_spec)?);
        }
        Ok(messages.join("\n"))
    }
}

impl Registrable for MultiIndex {
    fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.levels[0].name().to_string(),
        }
    }

    fn component_names(&self) -> Vec<String> {
        self.levels.iter().flat_map(|l| l.all_names()).collect()
    }

    fn registered_names(&self, name: &str) -> Vec<String> {
        self.levels
            .iter()
            .enumerate()
            .flat_map(|(i, l)| l.registered_names(&naming::multi_index_key(name, i)))
            .collect()
    }

    fn with_name(self, name: &str) -> Self {
        Self {
            levels: self
                .levels
                .into_iter()
                .enumerate()
                .map(|(i, l)| l.renamed(&naming::multi_index_key(name, i)))
                .collect(),
            ..self
        }
    }

    fn required_names(&self) -> Vec<String> {
        self.levels
            .iter()
            .flat_map(|l| l.component_names().to_vec())
            .collect()
    }
}
