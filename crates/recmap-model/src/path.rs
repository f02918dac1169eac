//! Target path syntax.
//!
//! A target path addresses a leaf in the destination object. Nested objects
//! are separated by dots and repeated slots carry a bracketed index:
//!
//! - `username`
//! - `personal.lastName`
//! - `departments[0]`
//! - `personal.addresses[2].city`

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ModelError, Result};

/// One dot-separated step of a [`TargetPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Plain property name.
    Key(String),
    /// Property name followed by a slot index (`name[i]`).
    Indexed { key: String, index: usize },
}

impl PathSegment {
    pub fn key(&self) -> &str {
        match self {
            Self::Key(key) | Self::Indexed { key, .. } => key,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Key(_) => None,
            Self::Indexed { index, .. } => Some(*index),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Indexed { key, index } => write!(f, "{key}[{index}]"),
        }
    }
}

/// Parsed dot/bracket target path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetPath {
    segments: Vec<PathSegment>,
}

impl TargetPath {
    /// Parse a path such as `personal.addresses[0].city`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid(raw, "path is empty"));
        }
        let mut segments = Vec::new();
        for part in trimmed.split('.') {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid(raw, "empty segment"));
            }
            match part.split_once('[') {
                None => segments.push(PathSegment::Key(part.to_string())),
                Some((key, rest)) => {
                    if key.is_empty() {
                        return Err(invalid(raw, "index without a property name"));
                    }
                    let digits = rest
                        .strip_suffix(']')
                        .ok_or_else(|| invalid(raw, "unterminated index"))?;
                    let index = digits
                        .trim()
                        .parse::<usize>()
                        .map_err(|_| invalid(raw, "index is not a non-negative integer"))?;
                    segments.push(PathSegment::Indexed {
                        key: key.to_string(),
                        index,
                    });
                }
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of object levels the path descends through.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The path with every slot index removed.
    ///
    /// `personal.addresses[0].city` becomes `personal.addresses.city`; used to
    /// bind reference data tables independently of the slot.
    pub fn without_indices(&self) -> String {
        self.segments
            .iter()
            .map(PathSegment::key)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Follow the path through an assembled object.
    pub fn lookup<'a>(&self, root: &'a Map<String, Value>) -> Option<&'a Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = root;
        for segment in parents {
            let value = step(current, segment)?;
            current = value.as_object()?;
        }
        step(current, last)
    }
}

fn step<'a>(object: &'a Map<String, Value>, segment: &PathSegment) -> Option<&'a Value> {
    let value = object.get(segment.key())?;
    match segment.index() {
        None => Some(value),
        Some(index) => value.as_array()?.get(index),
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TargetPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// `parent.name`, or `name` at the root.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

/// `parent.name[index]`, or `name[index]` at the root.
pub fn slot_path(parent: &str, name: &str, index: usize) -> String {
    format!("{}[{index}]", child_path(parent, name))
}

/// Remove every `[n]` slot index from a raw path string.
pub fn strip_indices(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut in_index = false;
    for ch in path.chars() {
        match ch {
            '[' => in_index = true,
            ']' => in_index = false,
            _ if !in_index => out.push(ch),
            _ => {}
        }
    }
    out
}

fn invalid(path: &str, message: &str) -> ModelError {
    ModelError::InvalidPath {
        path: path.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_indexed_path() {
        let path = TargetPath::parse("personal.addresses[2].city").unwrap();
        assert_eq!(path.depth(), 3);
        assert_eq!(path.segments()[1].index(), Some(2));
        assert_eq!(path.to_string(), "personal.addresses[2].city");
        assert_eq!(path.without_indices(), "personal.addresses.city");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(TargetPath::parse("").is_err());
        assert!(TargetPath::parse("a..b").is_err());
        assert!(TargetPath::parse("a[x]").is_err());
        assert!(TargetPath::parse("a[1").is_err());
        assert!(TargetPath::parse("[1]").is_err());
    }

    #[test]
    fn lookup_follows_objects_and_slots() {
        let value = json!({
            "personal": {"addresses": [{"city": "Fritsla"}], "lastName": "Graney"}
        });
        let root = value.as_object().unwrap();
        let city = TargetPath::parse("personal.addresses[0].city").unwrap();
        assert_eq!(city.lookup(root), Some(&json!("Fritsla")));
        let missing = TargetPath::parse("personal.addresses[1].city").unwrap();
        assert_eq!(missing.lookup(root), None);
    }

    #[test]
    fn builds_child_and_slot_paths() {
        assert_eq!(child_path("", "username"), "username");
        assert_eq!(child_path("personal", "email"), "personal.email");
        assert_eq!(slot_path("personal", "addresses", 3), "personal.addresses[3]");
        assert_eq!(strip_indices("personal.addresses[3].city"), "personal.addresses.city");
        assert_eq!(strip_indices("departments[0]"), "departments");
    }
}
