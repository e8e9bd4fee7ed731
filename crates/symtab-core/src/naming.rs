//! Deterministic server-side naming for registered objects.
//!
//! `.` separates a composite object's name from its component suffix, so
//! user-chosen names may not contain it. Strings parts are the exception and
//! use `_bytes` / `_offsets` directly after the parent name.

use crate::dtype::ObjectKind;
use crate::error::{Error, Result};
use crate::handle::StringsPart;

pub const SEPARATOR: char = '.';

pub const CODES: &str = "codes";
pub const CATEGORIES: &str = "categories";
pub const SEGMENTS: &str = "segments";
pub const VALUES: &str = "values";
pub const PERMUTATION: &str = "permutation";
pub const COLUMNS: &str = "columns";

/// Check a user-chosen durable name.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if name.contains(SEPARATOR) {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "'.' is reserved for component names",
        });
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "whitespace is not transport-safe",
        });
    }
    Ok(())
}

/// Replace whitespace so an arbitrary key can be used in a name.
pub fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

pub fn component(name: &str, suffix: &str) -> String {
    format!("{}{}{}", name, SEPARATOR, suffix)
}

/// Names the components of a `kind` object take when it is registered as `name`.
pub fn component_names(kind: ObjectKind, name: &str) -> Vec<String> {
    match kind {
        ObjectKind::Array | ObjectKind::Strings => vec![name.to_string()],
        ObjectKind::Categorical => vec![component(name, CODES), component(name, CATEGORIES)],
        ObjectKind::SegArray => vec![component(name, SEGMENTS), component(name, VALUES)],
    }
}

pub fn strings_part(name: &str, part: StringsPart) -> String {
    format!("{}{}", name, part.suffix())
}

pub fn index_key(label: &str) -> String {
    format!("{}_key", label)
}

pub fn multi_index_key(label: &str, level: usize) -> String {
    format!("{}_key_{}", label, level)
}

pub fn group_keys(name: &str, i: usize) -> String {
    component(name, &format!("keys_{}", i))
}

pub fn group_unique_keys(name: &str, i: usize) -> String {
    component(name, &format!("unique_keys_{}", i))
}

pub fn table_column(name: &str, i: usize) -> String {
    component(name, &format!("col_{}", i))
}

/// Label under which a table's index levels are registered (`<name>.index_key_<i>`).
pub fn table_index_label(name: &str) -> String {
    component(name, "index")
}

/// Logical object a server name belongs to: everything before the first `.`.
pub fn object_root(name: &str) -> &str {
    match name.find(SEPARATOR) {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// If `name` looks like a strings part, return the parent name.
pub fn strings_parent(name: &str) -> Option<&str> {
    [StringsPart::Bytes, StringsPart::Offsets]
        .iter()
        .find_map(|p| name.strip_suffix(p.suffix()))
        .filter(|parent| !parent.is_empty())
}
