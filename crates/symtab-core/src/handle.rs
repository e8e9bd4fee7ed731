//! `RemoteHandle`: a local value naming server-resident state.
//!
//! A handle carries no ownership. Several handles may name the same remote
//! object; registration status always lives in the engine's registry and is
//! never cached here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dtype::{DType, ObjectKind, Semantic};
use crate::naming;

/// Auxiliary arrays a strings object can materialize on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringsPart {
    Bytes,
    Offsets,
}

impl StringsPart {
    pub fn suffix(&self) -> &'static str {
        match self {
            StringsPart::Bytes => "_bytes",
            StringsPart::Offsets => "_offsets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHandle {
    name: String,
    kind: ObjectKind,
    dtype: DType,
    size: usize,
    components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parts: Vec<(StringsPart, String)>,
    #[serde(default)]
    semantic: Semantic,
}

impl RemoteHandle {
    /// A single-symbol numeric/bool array.
    pub fn array(name: impl Into<String>, dtype: DType, size: usize) -> Self {
        let name = name.into();
        Self {
            components: vec![name.clone()],
            name,
            kind: ObjectKind::Array,
            dtype,
            size,
            parts: Vec::new(),
            semantic: Semantic::Plain,
        }
    }

    /// A single-symbol string column.
    pub fn strings(name: impl Into<String>, size: usize) -> Self {
        let name = name.into();
        Self {
            components: vec![name.clone()],
            name,
            kind: ObjectKind::Strings,
            dtype: DType::Str,
            size,
            parts: Vec::new(),
            semantic: Semantic::Plain,
        }
    }

    /// An object spanning several server symbols.
    pub fn composite(
        name: impl Into<String>,
        kind: ObjectKind,
        dtype: DType,
        size: usize,
        components: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            dtype,
            size,
            components,
            parts: Vec::new(),
            semantic: Semantic::Plain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn semantic(&self) -> &Semantic {
        &self.semantic
    }

    /// Ordered server names this handle logically spans.
    pub fn component_names(&self) -> &[String] {
        &self.components
    }

    /// Materialized strings parts, if any.
    pub fn parts(&self) -> &[(StringsPart, String)] {
        &self.parts
    }

    pub fn part(&self, part: StringsPart) -> Option<&str> {
        self.parts
            .iter()
            .find(|(p, _)| *p == part)
            .map(|(_, n)| n.as_str())
    }

    pub fn with_semantic(mut self, semantic: Semantic) -> Self {
        self.semantic = semantic;
        self
    }

    /// Record a materialized strings part, replacing any previous one.
    pub fn with_part(mut self, part: StringsPart, name: impl Into<String>) -> Self {
        self.parts.retain(|(p, _)| *p != part);
        self.parts.push((part, name.into()));
        self.parts.sort();
        self
    }

    /// Every server name that registers/unregisters with this handle,
    /// components first, then strings parts.
    pub fn all_names(&self) -> Vec<String> {
        self.components
            .iter()
            .cloned()
            .chain(self.parts.iter().map(|(_, n)| n.clone()))
            .collect()
    }

    /// Names `all_names()` take once the handle is registered as `name`.
    pub fn registered_names(&self, name: &str) -> Vec<String> {
        naming::component_names(self.kind, name)
            .into_iter()
            .chain(
                self.parts
                    .iter()
                    .map(|(p, _)| naming::strings_part(name, *p)),
            )
            .collect()
    }

    /// The same object under its registered identity `name`.
    pub fn renamed(mut self, name: &str) -> Self {
        self.components = naming::component_names(self.kind, name);
        for (part, part_name) in self.parts.iter_mut() {
            *part_name = naming::strings_part(name, *part);
        }
        self.name = name.to_string();
        self
    }

    /// True when both handles refer to the same server symbols.
    pub fn same_object(&self, other: &RemoteHandle) -> bool {
        self.components == other.components
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}, size={})", self.name, self.kind_str(), self.dtype, self.size)
    }
}

impl RemoteHandle {
    fn kind_str(&self) -> &'static str {
        match self.kind {
            ObjectKind::Array => "array",
            ObjectKind::Strings => "strings",
            ObjectKind::Categorical => "categorical",
            ObjectKind::SegArray => "segarray",
        }
    }
}
