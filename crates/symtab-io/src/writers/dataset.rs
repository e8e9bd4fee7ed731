//! Columnar dataset container: one file holds several named columns.
//!
//! On disk the container is JSON, optionally wrapped in a zstd frame. The
//! frame is detected by its magic number on load, so readers need not know
//! which compression a writer chose.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use symtab_core::protocol::Compression;
use symtab_core::scalar::Scalar;

use crate::error::{Error, Result};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub datasets: BTreeMap<String, Vec<Scalar>>,
}

impl DatasetFile {
    pub fn single(dataset: &str, values: Vec<Scalar>) -> Self {
        let mut datasets = BTreeMap::new();
        datasets.insert(dataset.to_string(), values);
        Self { datasets }
    }

    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(Error::MissingFile(path.to_string()));
        }
        let raw = fs::read(path)?;
        let json = if raw.starts_with(&ZSTD_MAGIC) {
            zstd::stream::decode_all(raw.as_slice())?
        } else {
            raw
        };
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn save(&self, path: &str, compression: Option<Compression>) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        let bytes = match compression {
            Some(Compression::Zstd) => zstd::stream::encode_all(json.as_slice(), ZSTD_LEVEL)?,
            None => json,
        };
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Add a dataset; an existing dataset of the same name is an error.
    pub fn insert_new(&mut self, path: &str, dataset: &str, values: Vec<Scalar>) -> Result<()> {
        if self.datasets.contains_key(dataset) {
            return Err(Error::DatasetExists {
                path: path.to_string(),
                dataset: dataset.to_string(),
            });
        }
        self.datasets.insert(dataset.to_string(), values);
        Ok(())
    }

    pub fn get(&self, path: &str, dataset: &str) -> Result<&[Scalar]> {
        self.datasets
            .get(dataset)
            .map(|v| v.as_slice())
            .ok_or_else(|| Error::DatasetMissing {
                path: path.to_string(),
                dataset: dataset.to_string(),
            })
    }
}
