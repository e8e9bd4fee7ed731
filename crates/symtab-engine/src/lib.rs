#![forbid(unsafe_code)]
//! symtab-engine: an in-memory stand-in for the remote compute engine.
//!
//! `MemoryEngine` implements both halves of the engine contract
//! (`SymbolTable` and `ArrayOps`) over a name → symbol map guarded by a
//! mutex. Composite objects exist only as naming conventions over plain
//! symbols, exactly as the client sees them.

pub mod kernels;
pub mod resolve;
pub mod snapshot;
pub mod state;
pub mod table;

pub use state::{EngineState, MemoryEngine, Stored, Symbol};
