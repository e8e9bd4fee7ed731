pub use crate::config::ClientConfig;
pub use crate::dtype::{DType, ObjectKind, Semantic, SemanticKind};
pub use crate::engine::{ArrayOps, Engine, Grouping, Operand, SymbolTable};
pub use crate::error::{Error, RemoteError, Result};
pub use crate::handle::{RemoteHandle, StringsPart};
pub use crate::protocol::{
    Compression, DTypeHint, DeleteOutcome, ExportSpec, FileFormat, RawObject, RawPart, Scope,
    TypeTag, WriteMode,
};
pub use crate::scalar::Scalar;
