//! The remote engine as seen from the client.
//!
//! Everything the client knows about server state goes through these two
//! traits, so tests can substitute an in-memory implementation. Calls are
//! synchronous request/response; nothing is cached between calls.
//!
//! Invariants:
//! - `SymbolTable::list(RegisteredSymbols)` ⊆ `list(AllSymbols)`.
//! - After `clear()`, both scopes return the same set.
//! - `delete` never removes a registered name.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::handle::{RemoteHandle, StringsPart};
use crate::protocol::{DTypeHint, DeleteOutcome, ExportSpec, RawObject, Scope};
use crate::scalar::Scalar;

/// Registry side of the engine contract.
pub trait SymbolTable {
    /// Resolve a durable name without recreating server state.
    fn attach(&self, name: &str, hint: DTypeHint) -> Result<RawObject>;

    /// Register one symbol as `new_name`, renaming it if needed. Returns the updated name.
    fn register(&self, name: &str, new_name: &str) -> Result<String>;

    /// Drop the registered flag of one symbol. The symbol itself survives until reclaimed.
    fn unregister(&self, name: &str) -> Result<()>;

    fn list(&self, scope: Scope) -> Result<BTreeSet<String>>;

    /// Remove every unregistered symbol.
    fn clear(&self) -> Result<()>;

    fn delete(&self, name: &str) -> Result<DeleteOutcome>;

    /// Unregister every component of the object called `name`. Returns the engine's message.
    fn unregister_by_name(&self, name: &str, hint: DTypeHint) -> Result<String>;
}

/// Right-hand side of an element-wise comparison.
#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Handle(&'a RemoteHandle),
    Scalar(Scalar),
}

impl<'a> From<&'a RemoteHandle> for Operand<'a> {
    fn from(h: &'a RemoteHandle) -> Self {
        Operand::Handle(h)
    }
}

impl From<Scalar> for Operand<'_> {
    fn from(s: Scalar) -> Self {
        Operand::Scalar(s)
    }
}

/// Result of grouping by one or more aligned key arrays.
///
/// `segments[g]` is the offset in `permutation` where group `g` starts;
/// `unique_keys` holds one array per key level, one row per group, in
/// ascending key order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub permutation: RemoteHandle,
    pub segments: RemoteHandle,
    pub unique_keys: Vec<RemoteHandle>,
}

impl Grouping {
    pub fn num_groups(&self) -> usize {
        self.segments.size()
    }
}

/// Array kernels, consumed only through their public contract.
pub trait ArrayOps {
    /// Upload local values; dtype is inferred and must be uniform.
    fn create(&self, values: Vec<Scalar>) -> Result<RemoteHandle>;

    /// Encode a strings array as codes + categories.
    fn categorical(&self, strings: &RemoteHandle) -> Result<RemoteHandle>;

    fn segarray(&self, segments: &RemoteHandle, values: &RemoteHandle) -> Result<RemoteHandle>;

    /// Download values (categoricals come back decoded).
    fn fetch(&self, handle: &RemoteHandle) -> Result<Vec<Scalar>>;

    fn arange(&self, start: i64, stop: i64, step: i64) -> Result<RemoteHandle>;

    /// Concatenate same-typed arrays. With `ordered == false` the engine may
    /// interleave inputs in any order.
    fn concat(&self, items: &[&RemoteHandle], ordered: bool) -> Result<RemoteHandle>;

    fn group_by(&self, keys: &[&RemoteHandle]) -> Result<Grouping>;

    /// Stable lexicographic sort permutation, `keys[0]` most significant.
    fn coargsort(&self, keys: &[&RemoteHandle]) -> Result<RemoteHandle>;

    fn argsort(&self, handle: &RemoteHandle) -> Result<RemoteHandle> {
        self.coargsort(&[handle])
    }

    /// Gather `handle[perm[i]]`.
    fn take(&self, handle: &RemoteHandle, perm: &RemoteHandle) -> Result<RemoteHandle>;

    fn negate(&self, handle: &RemoteHandle) -> Result<RemoteHandle>;

    /// Element-wise equality, producing a bool array.
    fn compare_eq(&self, handle: &RemoteHandle, other: Operand<'_>) -> Result<RemoteHandle>;

    fn and(&self, a: &RemoteHandle, b: &RemoteHandle) -> Result<RemoteHandle>;

    fn count_true(&self, mask: &RemoteHandle) -> Result<usize>;

    /// Row-wise membership of the `haystack` tuples in the set of `needles` tuples.
    fn in1d(&self, haystack: &[&RemoteHandle], needles: &[&RemoteHandle]) -> Result<RemoteHandle>;

    /// Materialize the bytes or offsets array of a strings object.
    fn strings_part(&self, handle: &RemoteHandle, part: StringsPart) -> Result<RemoteHandle>;

    /// Write the handle's values to files described by `spec`.
    fn export(&self, handle: &RemoteHandle, spec: &ExportSpec) -> Result<String>;
}

/// Full engine: registry plus kernels.
pub trait Engine: SymbolTable + ArrayOps {}

impl<T: SymbolTable + ArrayOps + ?Sized> Engine for T {}
