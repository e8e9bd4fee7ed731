#![forbid(unsafe_code)]
//! symtab-index: ordered key views over remote arrays.
//!
//! `Index` wraps one handle, `MultiIndex` a tuple of aligned handles.
//! Set operations run on raw values; the semantic wrapper of the input is
//! restored on the output through a [`Callback`] resolved at construction.

pub mod callback;
pub mod factory;
pub mod index;
pub mod multi;

pub use callback::{Callback, CallbackRegistry, Restore};
pub use factory::{IndexSource, KeyIndex};
pub use index::{Index, LookupKey};
pub use multi::{Comparand, MultiIndex};
