//! Request/response shapes of the remote engine contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dtype::DType;
use crate::error::Error;

/// Closed set of object types `attach` knows how to rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "categorical")]
    Categorical,
    #[serde(rename = "segmented-array")]
    SegArray,
    #[serde(rename = "grouped-result")]
    GroupedResult,
    #[serde(rename = "tabular")]
    Tabular,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Plain,
        TypeTag::String,
        TypeTag::Categorical,
        TypeTag::SegArray,
        TypeTag::GroupedResult,
        TypeTag::Tabular,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Plain => "plain",
            TypeTag::String => "string",
            TypeTag::Categorical => "categorical",
            TypeTag::SegArray => "segmented-array",
            TypeTag::GroupedResult => "grouped-result",
            TypeTag::Tabular => "tabular",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownRemoteType { tag: s.to_string() })
    }
}

/// Type hint passed along with attach / unregister-by-name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DTypeHint {
    #[default]
    Infer,
    Tag(TypeTag),
}

impl FromStr for DTypeHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "infer" {
            Ok(DTypeHint::Infer)
        } else {
            s.parse().map(DTypeHint::Tag)
        }
    }
}

/// Registry query scope; registered ⊆ all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    AllSymbols,
    RegisteredSymbols,
}

/// Attach reply as it comes off the wire.
///
/// `tag` stays a raw string here; the client parses it into [`TypeTag`] and
/// rejects anything it does not recognize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObject {
    pub tag: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DType>,
    #[serde(default)]
    pub size: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<RawPart>,
}

/// Named sub-object of a grouped or tabular reply (`keys_0`, `col:price`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPart {
    pub role: String,
    pub object: RawObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOutcome {
    Deleted,
    /// The engine refused because the name is registered.
    RegisteredNotDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Truncate,
    /// Add a dataset to existing files; never creates them.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Dataset container: named columns in one file.
    #[default]
    Columnar,
    /// One column of rows headed by the dataset name.
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Zstd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSpec {
    pub prefix_path: String,
    pub dataset: String,
    #[serde(default)]
    pub mode: WriteMode,
    #[serde(default)]
    pub format: FileFormat,
    #[serde(default)]
    pub compression: Option<Compression>,
}

impl ExportSpec {
    pub fn new(prefix_path: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            prefix_path: prefix_path.into(),
            dataset: dataset.into(),
            mode: WriteMode::Truncate,
            format: FileFormat::Columnar,
            compression: None,
        }
    }

    pub fn mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn format(mut self, format: FileFormat) -> Self {
        self.format = format;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Same target, different dataset name.
    pub fn with_dataset(&self, dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..self.clone()
        }
    }

    /// Per-locale output file name.
    pub fn locale_path(&self, locale: usize) -> String {
        format!("{}_LOCALE{:04}", self.prefix_path, locale)
    }
}
