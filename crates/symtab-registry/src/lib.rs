#![forbid(unsafe_code)]
//! symtab-registry: persisting, attaching and dropping server objects by name.
//!
//! Every call re-queries the engine. Nothing here caches registration
//! status; a handle only knows which server names it spans.

pub mod attach;
pub mod bulk;
pub mod objects;
pub mod protocol;
pub mod registrable;

pub use attach::{attach, Attached};
pub use bulk::{attach_all, register_all, unregister_all, Collection};
pub use objects::{GroupedResult, Table};
pub use protocol::{
    clear, delete, is_registered, list_registry, list_symbol_table, register, strings_part,
    unregister, unregister_by_name,
};
pub use registrable::Registrable;
