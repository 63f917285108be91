//! Typed property values.
//!
//! Every property is classified exactly once, when the parser reads it, into
//! one variant of [`PropertyValue`]. Consumers pattern-match on the variant
//! instead of guessing at the shape of a value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of a single node property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum PropertyValue {
    /// `<42>` or `<0x2A>`.
    Int(i64),
    /// `<1 2 3>`.
    IntArray(Vec<i64>),
    /// `"median"`.
    Str(String),
    /// A bare property name with no value.
    Flag,
    /// `<&label>`.
    Ref(String),
    /// `<&a &b &c>`.
    RefList(Vec<String>),
}

impl PropertyValue {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "integer",
            PropertyValue::IntArray(_) => "integer array",
            PropertyValue::Str(_) => "string",
            PropertyValue::Flag => "flag",
            PropertyValue::Ref(_) => "reference",
            PropertyValue::RefList(_) => "reference list",
        }
    }

    /// The value as a single integer.
    ///
    /// A one-element array counts as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            PropertyValue::IntArray(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// The value as an integer sequence. A single integer is a one-element sequence.
    pub fn as_ints(&self) -> Option<Vec<i64>> {
        match self {
            PropertyValue::Int(v) => Some(vec![*v]),
            PropertyValue::IntArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The value as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The referenced labels, for either reference variant.
    pub fn ref_labels(&self) -> Option<Vec<&str>> {
        match self {
            PropertyValue::Ref(label) => Some(vec![label.as_str()]),
            PropertyValue::RefList(labels) => Some(labels.iter().map(String::as_str).collect()),
            _ => None,
        }
    }

    /// Whether this value still names a label that needs resolving.
    pub fn is_reference(&self) -> bool {
        matches!(self, PropertyValue::Ref(_) | PropertyValue::RefList(_))
    }
}

impl fmt::Display for PropertyValue {
    /// Render in description-language syntax (without the trailing `;`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "<{v}>"),
            PropertyValue::IntArray(values) => {
                write!(f, "<")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, ">")
            }
            PropertyValue::Str(s) => write!(f, "\"{s}\""),
            PropertyValue::Flag => Ok(()),
            PropertyValue::Ref(label) => write!(f, "<&{label}>"),
            PropertyValue::RefList(labels) => {
                write!(f, "<")?;
                for (i, label) in labels.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "&{label}")?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Canonical spelling of a property name: underscores become dashes.
pub fn normalize_name(name: &str) -> String {
    name.replace('_', "-")
}

/// Properties of one node, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: Vec<(String, PropertyValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property. A replaced property keeps its position.
    pub fn insert(&mut self, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        let name = normalize_name(name);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Iterate in sorted key order, for deterministic emission.
    pub fn sorted(&self) -> Vec<(&str, &PropertyValue)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropertyValue::as_int)
    }

    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        self.int(name).unwrap_or(default)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_str)
    }

    /// A flag is set when present with no value, or as a nonzero integer.
    pub fn flag(&self, name: &str) -> bool {
        match self.get(name) {
            Some(PropertyValue::Flag) => true,
            Some(v) => v.as_int().is_some_and(|i| i != 0),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_normalizes_and_keeps_order() {
        let mut props = Properties::new();
        props.insert("voting_method", PropertyValue::Str("median".into()));
        props.insert("tolerance", PropertyValue::Int(50));
        props.insert("voting-method", PropertyValue::Str("max".into()));

        let names: Vec<_> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["voting-method", "tolerance"]);
        assert_eq!(props.str("voting_method"), Some("max"));
    }

    #[test]
    fn sorted_is_by_key() {
        let mut props = Properties::new();
        props.insert("zeta", PropertyValue::Flag);
        props.insert("alpha", PropertyValue::Int(1));
        let keys: Vec<_> = props.sorted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn int_accessors() {
        let mut props = Properties::new();
        props.insert("single", PropertyValue::IntArray(vec![9]));
        props.insert("many", PropertyValue::IntArray(vec![1, 2]));
        assert_eq!(props.int("single"), Some(9));
        assert_eq!(props.int("many"), None);
        assert_eq!(props.int_or("missing", 7), 7);
        assert_eq!(
            props.get("many").and_then(PropertyValue::as_ints),
            Some(vec![1, 2])
        );
    }

    #[test]
    fn flags() {
        let mut props = Properties::new();
        props.insert("invert", PropertyValue::Flag);
        props.insert("continuous-verify", PropertyValue::Int(0));
        assert!(props.flag("invert"));
        assert!(!props.flag("continuous-verify"));
        assert!(!props.flag("absent"));
    }

    #[test]
    fn display_uses_description_syntax() {
        assert_eq!(PropertyValue::Int(5).to_string(), "<5>");
        assert_eq!(PropertyValue::IntArray(vec![1, 2]).to_string(), "<1 2>");
        assert_eq!(PropertyValue::Str("x".into()).to_string(), "\"x\"");
        assert_eq!(PropertyValue::Ref("a".into()).to_string(), "<&a>");
        assert_eq!(
            PropertyValue::RefList(vec!["a".into(), "b".into()]).to_string(),
            "<&a &b>"
        );
    }

    #[test]
    fn reference_labels() {
        let list = PropertyValue::RefList(vec!["a".into(), "b".into()]);
        assert_eq!(list.ref_labels(), Some(vec!["a", "b"]));
        assert!(list.is_reference());
        assert!(!PropertyValue::Int(1).is_reference());
    }
}
