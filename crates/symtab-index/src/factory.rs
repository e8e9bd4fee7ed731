//! Pick `Index` or `MultiIndex` from the shape of the input.

use symtab_core::engine::ArrayOps;
use symtab_core::error::{Error, Result};
use symtab_core::handle::RemoteHandle;
use symtab_core::scalar::Scalar;

use crate::index::Index;
use crate::multi::MultiIndex;

/// Accepted index inputs.
#[derive(Debug, Clone)]
pub enum IndexSource {
    Handle(RemoteHandle),
    /// One handle per level.
    Handles(Vec<RemoteHandle>),
    Values(Vec<Scalar>),
    /// Rows of equal arity.
    Tuples(Vec<Vec<Scalar>>),
}

#[derive(Debug, Clone)]
pub enum KeyIndex {
    Single(Index),
    Multi(MultiIndex),
}

impl KeyIndex {
    /// A single level yields an `Index`, several a `MultiIndex`.
    pub fn factory(engine: &(impl ArrayOps + ?Sized), source: IndexSource) -> Result<Self> {
        match source {
            IndexSource::Handle(h) => Index::new(h).map(KeyIndex::Single),
            IndexSource::Values(v) => Index::from_scalars(engine, v).map(KeyIndex::Single),
            IndexSource::Handles(mut hs) => match hs.len() {
                0 => Err(Error::TypeMismatch("cannot build an index from no arrays".into())),
                1 => Index::new(hs.remove(0)).map(KeyIndex::Single),
                _ => MultiIndex::new(hs).map(KeyIndex::Multi),
            },
            IndexSource::Tuples(rows) => {
                let columns = transpose(rows)?;
                if columns.len() == 1 {
                    let column = columns.into_iter().next().unwrap_or_default();
                    Index::from_scalars(engine, column).map(KeyIndex::Single)
                } else {
                    MultiIndex::from_scalars(engine, columns).map(KeyIndex::Multi)
                }
            }
        }
    }

    pub fn size(&self) -> usize {
        match self {
            KeyIndex::Single(i) => i.size(),
            KeyIndex::Multi(m) => m.size(),
        }
    }

    pub fn nlevels(&self) -> usize {
        match self {
            KeyIndex::Single(_) => 1,
            KeyIndex::Multi(m) => m.nlevels(),
        }
    }
}

fn transpose(rows: Vec<Vec<Scalar>>) -> Result<Vec<Vec<Scalar>>> {
    let arity = match rows.first() {
        Some(r) if !r.is_empty() => r.len(),
        _ => return Err(Error::TypeMismatch("cannot build an index from empty tuples".into())),
    };
    let mut columns: Vec<Vec<Scalar>> = vec![Vec::with_capacity(rows.len()); arity];
    for row in rows {
        if row.len() != arity {
            return Err(Error::TypeMismatch(format!(
                "tuple of arity {} in an index of arity {}",
                row.len(),
                arity
            )));
        }
        for (col, v) in columns.iter_mut().zip(row) {
            col.push(v);
        }
    }
    Ok(columns)
}
