//! Client/engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ENV_ANON_PREFIX: &str = "SYMTAB_ANON_PREFIX";
pub const ENV_NUM_LOCALES: &str = "SYMTAB_NUM_LOCALES";
pub const ENV_STATE: &str = "SYMTAB_STATE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Prefix of server-generated transient names.
    pub anon_prefix: String,
    /// Number of per-locale files an export writes.
    pub num_locales: usize,
    /// Snapshot file used by the CLI.
    pub state_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            anon_prefix: "id_".to_string(),
            num_locales: 1,
            state_path: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `SYMTAB_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(prefix) = std::env::var(ENV_ANON_PREFIX) {
            cfg.anon_prefix = prefix;
        }
        if let Some(n) = std::env::var(ENV_NUM_LOCALES)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            cfg.num_locales = n;
        }
        if let Ok(path) = std::env::var(ENV_STATE) {
            cfg.state_path = Some(path);
        }
        cfg
    }

    pub fn validate(&self) -> Result<()> {
        if self.anon_prefix.is_empty() {
            return Err(Error::Config("anon_prefix must not be empty".into()));
        }
        if self.anon_prefix.contains(crate::naming::SEPARATOR) {
            return Err(Error::Config("anon_prefix must not contain '.'".into()));
        }
        if self.num_locales == 0 {
            return Err(Error::Config("num_locales must be at least 1".into()));
        }
        Ok(())
    }
}
