#![forbid(unsafe_code)]
//! symtab-core: shared kernel for the symtab client.
//!
//! This crate contains only *pure* types and the traits the remote engine
//! is consumed through. There is **no I/O** here.
//!
//! Crates that use this:
//! - symtab-io: export writers keyed by `ExportSpec`.
//! - symtab-engine: implements `SymbolTable` + `ArrayOps` in memory.
//! - symtab-registry: the register/attach protocol over `SymbolTable`.
//! - symtab-index: Index/MultiIndex algebra over `ArrayOps`.

pub mod config;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod handle;
pub mod naming;
pub mod prelude;
pub mod protocol;
pub mod scalar;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
