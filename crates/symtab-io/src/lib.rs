#![forbid(unsafe_code)]
//! symtab-io: export writers.
//!
//! - `writers::dataset`: columnar container files (named datasets, optional zstd).
//! - `writers::csv`: single-column row files.
//! - `export`: splits values into per-locale chunks and applies `WriteMode`.

pub mod error;
pub mod export;
pub mod writers;

pub use export::export_values;
pub use writers::dataset::DatasetFile;
