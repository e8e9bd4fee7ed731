//! Multi-part objects: grouped results and tables.

use serde::{Deserialize, Serialize};

use symtab_core::engine::ArrayOps;
use symtab_core::error::{Error, Result};
use symtab_core::handle::RemoteHandle;
use symtab_core::naming;
use symtab_core::scalar::Scalar;

use crate::registrable::Registrable;

/// Output of grouping by one or more aligned key arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedResult {
    name: String,
    keys: Vec<RemoteHandle>,
    permutation: RemoteHandle,
    segments: RemoteHandle,
    unique_keys: Vec<RemoteHandle>,
}

impl GroupedResult {
    /// Group `keys` jointly on the engine.
    pub fn group_by(engine: &(impl ArrayOps + ?Sized), keys: Vec<RemoteHandle>) -> Result<Self> {
        let refs: Vec<&RemoteHandle> = keys.iter().collect();
        let grouping = engine.group_by(&refs)?;
        Ok(Self {
            name: grouping.permutation.name().to_string(),
            keys,
            permutation: grouping.permutation,
            segments: grouping.segments,
            unique_keys: grouping.unique_keys,
        })
    }

    pub(crate) fn from_parts(
        name: String,
        keys: Vec<RemoteHandle>,
        permutation: RemoteHandle,
        segments: RemoteHandle,
        unique_keys: Vec<RemoteHandle>,
    ) -> Result<Self> {
        if keys.is_empty() || keys.len() != unique_keys.len() {
            return Err(Error::TypeMismatch(format!(
                "grouped result '{}' has {} key(s) but {} unique key array(s)",
                name,
                keys.len(),
                unique_keys.len()
            )));
        }
        Ok(Self {
            name,
            keys,
            permutation,
            segments,
            unique_keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[RemoteHandle] {
        &self.keys
    }

    pub fn permutation(&self) -> &RemoteHandle {
        &self.permutation
    }

    pub fn segments(&self) -> &RemoteHandle {
        &self.segments
    }

    pub fn unique_keys(&self) -> &[RemoteHandle] {
        &self.unique_keys
    }

    pub fn num_groups(&self) -> usize {
        self.segments.size()
    }

    /// Number of grouped rows.
    pub fn size(&self) -> usize {
        self.permutation.size()
    }

    fn parts(&self) -> impl Iterator<Item = (String, &RemoteHandle)> + '_ {
        let name = &self.name;
        let keys = self
            .keys
            .iter()
            .enumerate()
            .map(move |(i, k)| (naming::group_keys(name, i), k));
        let uniques = self
            .unique_keys
            .iter()
            .enumerate()
            .map(move |(i, k)| (naming::group_unique_keys(name, i), k));
        keys.chain([
            (naming::component(name, naming::PERMUTATION), &self.permutation),
            (naming::component(name, naming::SEGMENTS), &self.segments),
        ])
        .chain(uniques)
    }
}

impl Registrable for GroupedResult {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn component_names(&self) -> Vec<String> {
        self.parts().flat_map(|(_, h)| h.all_names()).collect()
    }

    fn registered_names(&self, name: &str) -> Vec<String> {
        let renamed = Self {
            name: name.to_string(),
            ..self.clone()
        };
        renamed
            .parts()
            .flat_map(|(slot, h)| h.registered_names(&slot))
            .collect()
    }

    fn with_name(self, name: &str) -> Self {
        let name = name.to_string();
        Self {
            keys: self
                .keys
                .into_iter()
                .enumerate()
                .map(|(i, k)| k.renamed(&naming::group_keys(&name, i)))
                .collect(),
            permutation: self
                .permutation
                .renamed(&naming::component(&name, naming::PERMUTATION)),
            segments: self
                .segments
                .renamed(&naming::component(&name, naming::SEGMENTS)),
            unique_keys: self
                .unique_keys
                .into_iter()
                .enumerate()
                .map(|(i, k)| k.renamed(&naming::group_unique_keys(&name, i)))
                .collect(),
            name,
        }
    }

    fn required_names(&self) -> Vec<String> {
        self.parts()
            .flat_map(|(_, h)| h.component_names().to_vec())
            .collect()
    }
}

/// Labelled, equally sized columns with optional index levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    labels: RemoteHandle,
    columns: Vec<(String, RemoteHandle)>,
    index: Vec<RemoteHandle>,
}

impl Table {
    /// Build a table, uploading the column labels as a strings array.
    pub fn new(
        engine: &(impl ArrayOps + ?Sized),
        columns: Vec<(String, RemoteHandle)>,
        index: Vec<RemoteHandle>,
    ) -> Result<Self> {
        let size = match columns.first() {
            Some((_, col)) => col.size(),
            None => return Err(Error::TypeMismatch("a table needs at least one column".into())),
        };
        if let Some(bad) = columns
            .iter()
            .map(|(_, h)| h)
            .chain(index.iter())
            .find(|h| h.size() != size)
        {
            return Err(Error::TypeMismatch(format!(
                "table columns must share size {}, found {}",
                size, bad
            )));
        }
        let labels = engine.create(
            columns
                .iter()
                .map(|(label, _)| Scalar::Str(label.clone()))
                .collect(),
        )?;
        Ok(Self {
            name: labels.name().to_string(),
            labels,
            columns,
            index,
        })
    }

    pub(crate) fn from_parts(
        name: String,
        labels: RemoteHandle,
        columns: Vec<(String, RemoteHandle)>,
        index: Vec<RemoteHandle>,
    ) -> Self {
        Self {
            name,
            labels,
            columns,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self, label: &str) -> Option<&RemoteHandle> {
        self.columns
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, h)| h)
    }

    pub fn columns(&self) -> &[(String, RemoteHandle)] {
        &self.columns
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|(l, _)| l.as_str()).collect()
    }

    pub fn index(&self) -> &[RemoteHandle] {
        &self.index
    }

    pub fn size(&self) -> usize {
        self.columns.first().map(|(_, h)| h.size()).unwrap_or(0)
    }

    fn parts(&self) -> impl Iterator<Item = (String, &RemoteHandle)> + '_ {
        let name = &self.name;
        let index_label = naming::table_index_label(name);
        std::iter::once((naming::component(name, naming::COLUMNS), &self.labels))
            .chain(
                self.columns
                    .iter()
                    .enumerate()
                    .map(move |(i, (_, h))| (naming::table_column(name, i), h)),
            )
            .chain(
                self.index
                    .iter()
                    .enumerate()
                    .map(move |(i, h)| (naming::multi_index_key(&index_label, i), h)),
            )
    }
}

impl Registrable for Table {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn component_names(&self) -> Vec<String> {
        self.parts().flat_map(|(_, h)| h.all_names()).collect()
    }

    fn registered_names(&self, name: &str) -> Vec<String> {
        let renamed = Self {
            name: name.to_string(),
            ..self.clone()
        };
        renamed
            .parts()
            .flat_map(|(slot, h)| h.registered_names(&slot))
            .collect()
    }

    fn with_name(self, name: &str) -> Self {
        let index_label = naming::table_index_label(name);
        Self {
            labels: self.labels.renamed(&naming::component(name, naming::COLUMNS)),
            columns: self
                .columns
                .into_iter()
                .enumerate()
                .map(|(i, (label, h))| (label, h.renamed(&naming::table_column(name, i))))
                .collect(),
            index: self
                .index
                .into_iter()
                .enumerate()
                .map(|(i, h)| h.renamed(&naming::multi_index_key(&index_label, i)))
                .collect(),
            name: name.to_string(),
        }
    }

    fn required_names(&self) -> Vec<String> {
        self.parts()
            .flat_map(|(_, h)| h.component_names().to_vec())
            .collect()
    }
}
