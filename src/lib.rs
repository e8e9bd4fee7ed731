//! symtab: client-side registration, attach and composite-key index algebra
//! for arrays that live in a remote compute engine.
//!
//! The member crates are re-exported so downstream users need a single
//! dependency.

pub use symtab_core;
pub use symtab_engine;
pub use symtab_index;
pub use symtab_io;
pub use symtab_registry;

pub use symtab_core::prelude::*;
pub use symtab_engine::MemoryEngine;
pub use symtab_index::{Index, KeyIndex, MultiIndex};
pub use symtab_registry::{attach, is_registered, register, unregister, Attached};
