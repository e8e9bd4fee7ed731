use thiserror::Error;

/// Canonical result for the symtab crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by the remote engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The symbol table has no entry under this name (never created, deleted or cleared).
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// The engine understood the request and refused it.
    #[error("request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("naming conflict: '{name}' is already bound to a different object")]
    NamingConflict { name: String },

    /// Components of one logical object disagree on registration status.
    #[error(
        "registration inconsistency in '{object}': registered {registered:?}, unregistered {unregistered:?}"
    )]
    Inconsistent {
        object: String,
        registered: Vec<String>,
        unregistered: Vec<String>,
    },

    /// A multi-component mutation stopped part way; `completed` were already applied.
    #[error("{operation} of '{object}' failed at component '{failed}' after {completed:?}: {source}")]
    PartialUpdate {
        object: String,
        operation: &'static str,
        failed: String,
        completed: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    #[error("unknown remote object type '{tag}'")]
    UnknownRemoteType { tag: String },

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use symtab_core::error::Error;
    /// let err = Error::TypeMismatch("Index types must match".into());
    /// let err = err.with_context("while merging indices");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, looking through `Context` layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for the two bookkeeping-corruption variants callers must repair by hand.
    pub fn is_inconsistency(&self) -> bool {
        matches!(
            self.root(),
            Error::Inconsistent { .. } | Error::PartialUpdate { .. }
        )
    }

    /// True when the engine reported the name as absent from its symbol table.
    pub fn is_unknown_symbol(&self) -> bool {
        matches!(self.root(), Error::Remote(RemoteError::UnknownSymbol(_)))
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self.root() {
            Error::NamingConflict { name } => vec![
                format!("Unregister the object currently named '{}' first", name),
                "Pass overwrite=true to register_all to replace a previous run".into(),
            ],
            Error::Inconsistent { unregistered, .. } => vec![
                format!("Components {:?} were unregistered out of band", unregistered),
                "Re-register the object or unregister it by name to repair".into(),
            ],
            Error::PartialUpdate { completed, .. } => vec![
                format!("Components {:?} were already mutated", completed),
                "Inspect list_registry() before retrying".into(),
            ],
            Error::Remote(RemoteError::UnknownSymbol(_)) => vec![
                "The object may have been reclaimed by a bulk clear".into(),
                "Register objects that must survive clear()".into(),
            ],
            Error::InvalidName { .. } => {
                vec!["Names must be non-empty and contain no '.' or whitespace".into()]
            }
            _ => vec![],
        }
    }
}
