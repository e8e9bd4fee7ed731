//! `ArrayOps` implementation: the array kernels the client consumes.
//!
//! Straightforward in-memory versions. Results are always fresh transient
//! symbols; inputs are never mutated.

use std::collections::HashSet;

use tracing::trace;

use symtab_core::dtype::{DType, ObjectKind};
use symtab_core::engine::{ArrayOps, Grouping, Operand};
use symtab_core::error::{Error, Result};
use symtab_core::handle::{RemoteHandle, StringsPart};
use symtab_core::naming;
use symtab_core::protocol::ExportSpec;
use symtab_core::scalar::Scalar;

use crate::state::{infer_dtype, rejected, EngineState, MemoryEngine, Stored};

impl ArrayOps for MemoryEngine {
    fn create(&self, values: Vec<Scalar>) -> Result<RemoteHandle> {
        let dtype = infer_dtype(&values)?;
        let kind = if dtype == DType::Str {
            ObjectKind::Strings
        } else {
            ObjectKind::Array
        };
        let mut state = self.lock()?;
        state.store(&self.cfg.anon_prefix, kind, dtype, values)
    }

    fn categorical(&self, strings: &RemoteHandle) -> Result<RemoteHandle> {
        if strings.dtype() != DType::Str && strings.dtype() != DType::Categorical {
            return Err(Error::TypeMismatch(format!(
                "categorical requires string values, got {}",
                strings.dtype()
            )));
        }
        let mut state = self.lock()?;
        let values = state.values_of(strings)?;
        state.store(
            &self.cfg.anon_prefix,
            ObjectKind::Categorical,
            DType::Categorical,
            values,
        )
    }

    fn segarray(&self, segments: &RemoteHandle, values: &RemoteHandle) -> Result<RemoteHandle> {
        if segments.kind() != ObjectKind::Array || segments.dtype() != DType::Int64 {
            return Err(Error::TypeMismatch("segments must be an int64 array".into()));
        }
        if values.kind().is_composite() {
            return Err(Error::TypeMismatch(
                "segmented array values must be a single symbol".into(),
            ));
        }
        let mut state = self.lock()?;
        let starts = state.values_of(segments)?;
        let mut prev = 0i64;
        for (i, s) in starts.iter().enumerate() {
            let s = s.as_i64().unwrap_or(-1);
            if (i == 0 && s != 0) || s < prev || s as usize > values.size() {
                return Err(rejected("segments must start at 0 and be non-decreasing"));
            }
            prev = s;
        }
        let name = state.fresh_name(&self.cfg.anon_prefix);
        Ok(RemoteHandle::composite(
            name,
            ObjectKind::SegArray,
            values.dtype(),
            segments.size(),
            vec![
                segments.component_names()[0].clone(),
                values.component_names()[0].clone(),
            ],
        ))
    }

    fn fetch(&self, handle: &RemoteHandle) -> Result<Vec<Scalar>> {
        self.lock()?.values_of(handle)
    }

    fn arange(&self, start: i64, stop: i64, step: i64) -> Result<RemoteHandle> {
        if step == 0 {
            return Err(rejected("arange step must be non-zero"));
        }
        let mut values = Vec::new();
        let mut v = start;
        while (step > 0 && v < stop) || (step < 0 && v > stop) {
            values.push(Scalar::I64(v));
            v += step;
        }
        let mut state = self.lock()?;
        state.store(&self.cfg.anon_prefix, ObjectKind::Array, DType::Int64, values)
    }

    fn concat(&self, items: &[&RemoteHandle], ordered: bool) -> Result<RemoteHandle> {
        let first = items
            .first()
            .ok_or_else(|| rejected("concat needs at least one array"))?;
        if let Some(bad) = items
            .iter()
            .find(|h| h.kind() != first.kind() || h.dtype() != first.dtype())
        {
            return Err(Error::TypeMismatch(format!(
                "cannot concatenate {} with {}",
                first, bad
            )));
        }
        let mut state = self.lock()?;
        let mut values = Vec::new();
        for h in items {
            values.extend(state.values_of(h)?);
        }
        trace!(n = items.len(), ordered, total = values.len(), "concat");
        state.store_like(&self.cfg.anon_prefix, first, values)
    }

    fn group_by(&self, keys: &[&RemoteHandle]) -> Result<Grouping> {
        let mut state = self.lock()?;
        let columns = key_columns(&state, keys)?;
        let perm = lex_order(&columns);

        let mut starts = Vec::new();
        for (pos, &row) in perm.iter().enumerate() {
            let new_group = match pos.checked_sub(1).map(|p| perm[p]) {
                None => true,
                Some(prev) => columns.iter().any(|c| c[prev] != c[row]),
            };
            if new_group {
                starts.push(pos);
            }
        }

        let mut unique_keys = Vec::with_capacity(keys.len());
        for (key, col) in keys.iter().zip(&columns) {
            let vals = starts.iter().map(|&s| col[perm[s]].clone()).collect();
            unique_keys.push(state.store_like(&self.cfg.anon_prefix, key, vals)?);
        }
        let prefix = &self.cfg.anon_prefix;
        let permutation = state.store(prefix, ObjectKind::Array, DType::Int64, as_i64s(&perm))?;
        let segments = state.store(prefix, ObjectKind::Array, DType::Int64, as_i64s(&starts))?;
        trace!(rows = perm.len(), groups = starts.len(), "group_by");
        Ok(Grouping {
            permutation,
            segments,
            unique_keys,
        })
    }

    fn coargsort(&self, keys: &[&RemoteHandle]) -> Result<RemoteHandle> {
        let mut state = self.lock()?;
        let columns = key_columns(&state, keys)?;
        let perm = lex_order(&columns);
        state.store(&self.cfg.anon_prefix, ObjectKind::Array, DType::Int64, as_i64s(&perm))
    }

    fn take(&self, handle: &RemoteHandle, perm: &RemoteHandle) -> Result<RemoteHandle> {
        let mut state = self.lock()?;
        let values = state.values_of(handle)?;
        let idx = state.values_of(perm)?;
        let gathered = idx
            .iter()
            .map(|i| {
                i.as_i64()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| values.get(i).cloned())
                    .ok_or_else(|| rejected(format!("index {} out of bounds", i)))
            })
            .collect::<Result<Vec<_>>>()?;
        state.store_like(&self.cfg.anon_prefix, handle, gathered)
    }

    fn negate(&self, handle: &RemoteHandle) -> Result<RemoteHandle> {
        if handle.kind() != ObjectKind::Array || !handle.dtype().is_signed_numeric() {
            return Err(Error::TypeMismatch(format!("cannot negate {}", handle)));
        }
        let mut state = self.lock()?;
        let values = state
            .values_of(handle)?
            .into_iter()
            .map(|v| match v {
                Scalar::I64(i) => i
                    .checked_neg()
                    .map(Scalar::I64)
                    .ok_or_else(|| rejected(format!("cannot negate {} without overflow", i))),
                Scalar::F64(f) => Ok(Scalar::F64(-f)),
                other => Ok(other),
            })
            .collect::<Result<Vec<_>>>()?;
        state.store_like(&self.cfg.anon_prefix, handle, values)
    }

    fn compare_eq(&self, handle: &RemoteHandle, other: Operand<'_>) -> Result<RemoteHandle> {
        let mut state = self.lock()?;
        let left = state.values_of(handle)?;
        let mask: Vec<Scalar> = match other {
            Operand::Handle(h) => {
                let right = state.values_of(h)?;
                if right.len() != left.len() {
                    return Err(rejected(format!(
                        "size mismatch: {} vs {}",
                        left.len(),
                        right.len()
                    )));
                }
                left.iter().zip(&right).map(|(a, b)| Scalar::Bool(a == b)).collect()
            }
            Operand::Scalar(s) => left.iter().map(|a| Scalar::Bool(*a == s)).collect(),
        };
        state.store(&self.cfg.anon_prefix, ObjectKind::Array, DType::Bool, mask)
    }

    fn and(&self, a: &RemoteHandle, b: &RemoteHandle) -> Result<RemoteHandle> {
        let mut state = self.lock()?;
        let left = bools(&state, a)?;
        let right = bools(&state, b)?;
        if left.len() != right.len() {
            return Err(rejected(format!(
                "size mismatch: {} vs {}",
                left.len(),
                right.len()
            )));
        }
        let out = left
            .iter()
            .zip(&right)
            .map(|(x, y)| Scalar::Bool(*x && *y))
            .collect();
        state.store(&self.cfg.anon_prefix, ObjectKind::Array, DType::Bool, out)
    }

    fn count_true(&self, mask: &RemoteHandle) -> Result<usize> {
        let state = self.lock()?;
        Ok(bools(&state, mask)?.into_iter().filter(|b| *b).count())
    }

    fn in1d(&self, haystack: &[&RemoteHandle], needles: &[&RemoteHandle]) -> Result<RemoteHandle> {
        if haystack.len() != needles.len() {
            return Err(Error::TypeMismatch(format!(
                "in1d arity mismatch: {} levels vs {} key levels",
                haystack.len(),
                needles.len()
            )));
        }
        let mut state = self.lock()?;
        let hay = key_columns(&state, haystack)?;
        let keys = key_columns(&state, needles)?;
        let set: HashSet<Vec<&Scalar>> = (0..row_count(&keys))
            .map(|r| keys.iter().map(|c| &c[r]).collect())
            .collect();
        let mask = (0..row_count(&hay))
            .map(|r| {
                let row: Vec<&Scalar> = hay.iter().map(|c| &c[r]).collect();
                Scalar::Bool(set.contains(&row))
            })
            .collect();
        state.store(&self.cfg.anon_prefix, ObjectKind::Array, DType::Bool, mask)
    }

    fn strings_part(&self, handle: &RemoteHandle, part: StringsPart) -> Result<RemoteHandle> {
        if handle.kind() != ObjectKind::Strings {
            return Err(Error::TypeMismatch(format!(
                "{} is not a strings object",
                handle
            )));
        }
        let mut state = self.lock()?;
        let parent = handle.component_names()[0].clone();
        let registered_name = naming::strings_part(&parent, part);

        let parent_sym = state.get(&parent)?;
        let parent_registered = parent_sym.registered;
        let strings = match &parent_sym.data {
            Stored::Strings { values } => values.clone(),
            Stored::Array { .. } => return Err(rejected(format!("'{}' is not strings", parent))),
        };
        let (dtype, values) = match part {
            StringsPart::Bytes => (
                DType::UInt64,
                strings
                    .iter()
                    .flat_map(|s| s.bytes().chain(std::iter::once(0u8)))
                    .map(|b| Scalar::U64(b as u64))
                    .collect::<Vec<_>>(),
            ),
            StringsPart::Offsets => {
                let mut offset = 0i64;
                let offsets = strings
                    .iter()
                    .map(|s| {
                        let o = Scalar::I64(offset);
                        offset += s.len() as i64 + 1;
                        o
                    })
                    .collect::<Vec<_>>();
                (DType::Int64, offsets)
            }
        };

        let size = values.len();
        let data = Stored::Array { dtype, values };
        // Reuse an already materialized part, but never an unrelated symbol under its name.
        if let Ok(sym) = state.get(&registered_name) {
            if sym.data != data {
                return Err(rejected(format!(
                    "'{}' is held by an object that is not the {:?} part of '{}'",
                    registered_name, part, parent
                )));
            }
            return Ok(RemoteHandle::array(registered_name, dtype, size));
        }
        // Parts of a registered parent are registered under the derived name immediately.
        if parent_registered {
            state.insert(registered_name.clone(), data, true);
            Ok(RemoteHandle::array(registered_name, dtype, size))
        } else {
            let name = state.fresh_name(&self.cfg.anon_prefix);
            state.insert(name.clone(), data, false);
            Ok(RemoteHandle::array(name, dtype, size))
        }
    }

    fn export(&self, handle: &RemoteHandle, spec: &ExportSpec) -> Result<String> {
        let values = self.fetch(handle)?;
        let msg = symtab_io::export_values(&values, spec, self.cfg.num_locales)?;
        trace!(name = handle.name(), dataset = %spec.dataset, "exported");
        Ok(msg)
    }
}

fn key_columns(state: &EngineState, keys: &[&RemoteHandle]) -> Result<Vec<Vec<Scalar>>> {
    if keys.is_empty() {
        return Err(rejected("at least one key array is required"));
    }
    let columns = keys
        .iter()
        .map(|k| state.values_of(k))
        .collect::<Result<Vec<_>>>()?;
    let n = columns[0].len();
    if columns.iter().any(|c| c.len() != n) {
        return Err(rejected("key arrays must all have the same length"));
    }
    Ok(columns)
}

fn row_count(columns: &[Vec<Scalar>]) -> usize {
    columns.first().map(|c| c.len()).unwrap_or(0)
}

/// Stable lexicographic row order, column 0 most significant.
fn lex_order(columns: &[Vec<Scalar>]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..row_count(columns)).collect();
    perm.sort_by(|&a, &b| {
        columns
            .iter()
            .map(|c| c[a].cmp(&c[b]))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    perm
}

fn as_i64s(idx: &[usize]) -> Vec<Scalar> {
    idx.iter().map(|&i| Scalar::I64(i as i64)).collect()
}

fn bools(state: &EngineState, mask: &RemoteHandle) -> Result<Vec<bool>> {
    if mask.dtype() != DType::Bool {
        return Err(Error::TypeMismatch(format!("{} is not a bool array", mask)));
    }
    state
        .values_of(mask)?
        .iter()
        .map(|v| v.as_bool().ok_or_else(|| rejected("non-bool value in mask")))
        .collect()
}
