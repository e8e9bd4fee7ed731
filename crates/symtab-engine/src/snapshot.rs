//! JSON snapshots of the engine state, so CLI invocations share a table.

use std::fs;
use std::path::Path;

use tracing::debug;

use symtab_core::config::ClientConfig;
use symtab_core::error::{Error, Result};

use crate::state::{EngineState, MemoryEngine};

impl MemoryEngine {
    /// Load a snapshot; a missing file yields an empty engine.
    pub fn load(path: impl AsRef<Path>, cfg: ClientConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(Self::new(cfg));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let state: EngineState = serde_json::from_str(&text)
            .map_err(Error::from)
            .map_err(|e| e.with_context(format!("parsing snapshot {}", path.display())))?;
        debug!(path = %path.display(), symbols = state.symbols.len(), "loaded snapshot");
        Ok(Self::with_state(cfg, state))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let state = self.state()?;
        let text = serde_json::to_string_pretty(&state)?;
        fs::write(path, text)
            .map_err(|e| Error::Config(format!("cannot write {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), symbols = state.symbols.len(), "saved snapshot");
        Ok(())
    }
}
