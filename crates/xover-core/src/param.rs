//! Parameter values and the declarative parameter set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single parameter value.
///
/// Parameter files are JSON objects, so values are booleans, numbers, or
/// strings. Numbers are always carried as `f64`; integer-valued keys such as
/// `low_order` are converted at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Enumerated or free-form text.
    Text(String),
}

impl ParamValue {
    /// Returns the numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a flag.
    ///
    /// Numbers count as `true` when nonzero, so `"test_source": 1` works the
    /// same as `"test_source": true`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(v) => Some(*v != 0.0),
            ParamValue::Text(_) => None,
        }
    }

    /// Returns the text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(f64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Number(f64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// A complete, declarative parameter set.
///
/// Keys are unique and kept sorted, so iteration order is deterministic no
/// matter how the source file ordered them. Two sets are equal when they hold
/// the same key/value pairs.
///
/// # Example
///
/// ```rust
/// use xover_core::ParameterSet;
///
/// let old = ParameterSet::new()
///     .with("configuration", "mono")
///     .with("low_frequency", 2000.0);
/// let new = old.clone().with("low_frequency", 1500.0).with("volume", 0.05);
///
/// let changed: Vec<&str> = new.changed_from(&old).map(|(k, _)| k).collect();
/// assert_eq!(changed, ["low_frequency", "volume"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Pairs present in `self` but not in `previous`, in key order.
    ///
    /// A key counts as changed when it is new or its value differs. Keys that
    /// exist only in `previous` are ignored: removing a key does not revert it
    /// to a default.
    pub fn changed_from<'a>(
        &'a self,
        previous: &'a ParameterSet,
    ) -> impl Iterator<Item = (&'a str, &'a ParamValue)> + 'a {
        self.iter()
            .filter(move |(k, v)| previous.get(k) != Some(*v))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_from_reports_new_and_modified_keys() {
        let old = ParameterSet::new().with("a", 1.0).with("b", 2.0);
        let new = ParameterSet::new().with("a", 1.0).with("b", 3.0).with("c", true);
        let changed: Vec<_> = new.changed_from(&old).collect();
        assert_eq!(
            changed,
            vec![("b", &ParamValue::Number(3.0)), ("c", &ParamValue::Bool(true))]
        );
    }

    #[test]
    fn removed_keys_are_not_changes() {
        let old = ParameterSet::new().with("a", 1.0).with("b", 2.0);
        let new = ParameterSet::new().with("a", 1.0);
        assert_eq!(new.changed_from(&old).count(), 0);
    }

    #[test]
    fn equal_sets_have_no_changes() {
        let set = ParameterSet::new().with("volume", 0.01).with("configuration", "stereo");
        assert_eq!(set.changed_from(&set.clone()).count(), 0);
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let a = ParameterSet::new().with("x", 1.0).with("y", 2.0);
        let b = ParameterSet::new().with("y", 2.0).with("x", 1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn type_change_counts_as_change() {
        let old = ParameterSet::new().with("test_source", 1.0);
        let new = ParameterSet::new().with("test_source", true);
        assert_eq!(new.changed_from(&old).count(), 1);
    }

    #[test]
    fn value_accessors() {
        assert_eq!(ParamValue::Number(2.5).as_f64(), Some(2.5));
        assert_eq!(ParamValue::Number(0.0).as_bool(), Some(false));
        assert_eq!(ParamValue::Number(1.0).as_bool(), Some(true));
        assert_eq!(ParamValue::Bool(true).as_f64(), None);
        assert_eq!(ParamValue::from("mono").as_str(), Some("mono"));
        assert_eq!(ParamValue::from("mono").as_bool(), None);
    }

    #[test]
    fn json_values_deserialize_untagged() {
        let set: ParameterSet =
            serde_json::from_str(r#"{"configuration": "mono", "volume": 0.01, "test_source": false}"#)
                .unwrap();
        assert_eq!(set.get("configuration"), Some(&ParamValue::Text("mono".into())));
        assert_eq!(set.get("volume"), Some(&ParamValue::Number(0.01)));
        assert_eq!(set.get("test_source"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn display_formats() {
        assert_eq!(ParamValue::Number(1500.0).to_string(), "1500");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(ParamValue::from("stereo").to_string(), "\"stereo\"");
    }
}
