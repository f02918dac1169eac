//! Legacy source records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One subfield of a repeatable field; serialized MARC-in-JSON style as `{"a": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Subfield {
    pub code: String,
    pub value: String,
}

impl Subfield {
    pub fn new(code: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

impl TryFrom<BTreeMap<String, String>> for Subfield {
    type Error = String;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((code, value)), None) => Ok(Self { code, value }),
            _ => Err("a subfield must have exactly one code".to_string()),
        }
    }
}

impl From<Subfield> for BTreeMap<String, String> {
    fn from(subfield: Subfield) -> Self {
        BTreeMap::from([(subfield.code, subfield.value)])
    }
}

/// One occurrence of a repeatable field: indicators plus ordered subfields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInstance {
    #[serde(rename = "ind1", default)]
    pub indicator1: String,
    #[serde(rename = "ind2", default)]
    pub indicator2: String,
    #[serde(default)]
    pub subfields: Vec<Subfield>,
}

impl FieldInstance {
    pub fn new(indicator1: &str, indicator2: &str, subfields: Vec<Subfield>) -> Self {
        Self {
            indicator1: indicator1.to_string(),
            indicator2: indicator2.to_string(),
            subfields,
        }
    }

    /// Values of the subfields whose code is in `codes`, in field order.
    /// An empty `codes` selects every subfield.
    pub fn subfield_values<'a>(&'a self, codes: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        self.subfields
            .iter()
            .filter(move |sub| codes.is_empty() || codes.iter().any(|code| *code == sub.code))
            .map(|sub| sub.value.as_str())
    }

    /// Space-joined, trimmed subfield values.
    pub fn formatted(&self) -> String {
        join_non_empty(self.subfields.iter().map(|sub| sub.value.as_str()))
    }

    /// Indicator 2 as a digit, when it is one.
    pub fn indicator2_digit(&self) -> Option<u32> {
        let mut chars = self.indicator2.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => ch.to_digit(10),
            _ => None,
        }
    }
}

/// Value of one legacy field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyValue {
    Single(String),
    Repeated(Vec<FieldInstance>),
}

/// Immutable mapping from legacy field name to its value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegacyRecord {
    fields: BTreeMap<String, LegacyValue>,
}

impl LegacyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat record from `column -> cell` pairs (CSV/TSV rows).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), LegacyValue::Single(value.into())))
                .collect(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(field.into(), LegacyValue::Single(value.into()));
    }

    /// Append an instance of a repeatable field.
    pub fn push_field(&mut self, tag: impl Into<String>, instance: FieldInstance) {
        let entry = self
            .fields
            .entry(tag.into())
            .or_insert_with(|| LegacyValue::Repeated(Vec::new()));
        match entry {
            LegacyValue::Repeated(instances) => instances.push(instance),
            LegacyValue::Single(_) => *entry = LegacyValue::Repeated(vec![instance]),
        }
    }

    pub fn get(&self, field: &str) -> Option<&LegacyValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Trimmed text of a field: the cell for flat fields, the space-joined
    /// subfields of every instance for repeatable ones.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            LegacyValue::Single(value) => Some(value.trim().to_string()),
            LegacyValue::Repeated(instances) => {
                let formatted: Vec<String> =
                    instances.iter().map(FieldInstance::formatted).collect();
                Some(join_non_empty(formatted.iter().map(String::as_str)))
            }
        }
    }

    /// Instances of a repeatable field; empty for flat or missing fields.
    pub fn instances(&self, field: &str) -> &[FieldInstance] {
        match self.fields.get(field) {
            Some(LegacyValue::Repeated(instances)) => instances,
            _ => &[],
        }
    }

    /// Indicator 2 digit of the first instance of `field`.
    pub fn indicator2(&self, field: &str) -> Option<u32> {
        self.instances(field).first()?.indicator2_digit()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &LegacyValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn join_non_empty<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
