//! Template values: a recursive map of string leaves
//!
//! The same shape serves as the requirement skeleton produced by key
//! extraction and as the populated map templates are rendered against.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator used when nested keys are written as one dotted path
pub const PATH_SEPARATOR: char = '.';

/// A single slot in the values map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Leaf(String),
    Node(TemplateValues),
}

impl Value {
    /// An empty placeholder leaf
    #[must_use]
    pub const fn placeholder() -> Self {
        Self::Leaf(String::new())
    }
}

/// Mapping from variable name to a string or a nested mapping
///
/// Nested mappings are never empty: a map with no entries holds no dotted
/// path, so it is not stored. This keeps [`flatten`](Self::flatten) and
/// [`rebuild`](Self::rebuild) exact inverses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateValues(BTreeMap<String, Value>);

/// Why a dotted path could not be resolved to a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// No entry for the path prefix that ends at this depth
    Missing { path: String },
    /// The path stops on a nested map instead of a string
    NotALeaf { path: String },
    /// A string was found where the path needs to descend further
    NotANode { path: String },
}

impl TemplateValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Store `value` under `key`
    ///
    /// Inserting an empty nested map removes `key` instead.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match value {
            Value::Node(ref nested) if nested.is_empty() => self.0.remove(&key),
            value => self.0.insert(key, value),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record that a template needs the value at `path`
    ///
    /// Intermediate slots become nested maps (an empty or string slot is
    /// replaced). The final slot gets an empty placeholder only when absent,
    /// so already discovered entries are never overwritten.
    pub fn require_path<S: AsRef<str>>(&mut self, path: &[S]) {
        self.at_path(path, |parent, key| {
            parent
                .0
                .entry(key.to_owned())
                .or_insert_with(Value::placeholder);
        });
    }

    /// Store `value` at `path`, creating or replacing intermediate maps
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: String) {
        self.at_path(path, |parent, key| {
            parent.0.insert(key.to_owned(), Value::Leaf(value));
        });
    }

    /// Walk to the map holding the last key of `path` and hand it to `f`
    fn at_path<S, F>(&mut self, path: &[S], f: F)
    where
        S: AsRef<str>,
        F: FnOnce(&mut Self, &str),
    {
        match path {
            [] => {}
            [last] => f(self, last.as_ref()),
            [first, rest @ ..] => {
                let slot = self
                    .0
                    .entry(first.as_ref().to_owned())
                    .or_insert_with(|| Value::Node(Self::new()));
                match *slot {
                    Value::Node(ref mut nested) => nested.at_path(rest, f),
                    Value::Leaf(_) => {
                        let mut nested = Self::new();
                        nested.at_path(rest, f);
                        *slot = Value::Node(nested);
                    }
                }
            }
        }
    }

    /// Resolve a field path to its string value
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Result<&str, LookupError> {
        let joined = |depth: usize| {
            path[..=depth]
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(".")
        };

        let mut current = self;
        for (depth, key) in path.iter().enumerate() {
            let is_last = depth + 1 == path.len();
            match current.0.get(key.as_ref()) {
                None => return Err(LookupError::Missing { path: joined(depth) }),
                Some(Value::Leaf(value)) if is_last => return Ok(value.as_str()),
                Some(Value::Leaf(_)) => return Err(LookupError::NotANode { path: joined(depth) }),
                Some(Value::Node(_)) if is_last => {
                    return Err(LookupError::NotALeaf { path: joined(depth) });
                }
                Some(Value::Node(nested)) => current = nested,
            }
        }

        Err(LookupError::Missing {
            path: String::new(),
        })
    }

    /// Flatten nested keys into dotted paths mapped to their leaf values
    ///
    /// Every entry contributes at least one path since nested maps are
    /// never empty.
    #[must_use]
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut BTreeMap<String, String>) {
        for (key, value) in &self.0 {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}{PATH_SEPARATOR}{key}")
            };
            match *value {
                Value::Leaf(ref leaf) => {
                    out.insert(path, leaf.clone());
                }
                Value::Node(ref nested) => nested.flatten_into(&path, out),
            }
        }
    }

    /// Rebuild a nested map from dotted paths, the inverse of [`flatten`](Self::flatten)
    #[must_use]
    pub fn rebuild(flat: &BTreeMap<String, String>) -> Self {
        let mut values = Self::new();
        values.merge_flat(flat);
        values
    }

    /// Write every dotted path of `flat` into this map
    pub fn merge_flat(&mut self, flat: &BTreeMap<String, String>) {
        for (dotted, value) in flat {
            let keys: Vec<&str> = dotted.split(PATH_SEPARATOR).collect();
            self.set_path(&keys, value.clone());
        }
    }

    /// Overlay defaults onto leaves this map already requires
    ///
    /// Defaults for paths that are not leaves here are ignored. Returns the
    /// number of leaves that received a default.
    pub fn apply_defaults(&mut self, defaults: &BTreeMap<String, String>) -> usize {
        let required = self.flatten();
        let mut applied = 0;
        for (dotted, value) in defaults {
            if required.contains_key(dotted) {
                let keys: Vec<&str> = dotted.split(PATH_SEPARATOR).collect();
                self.set_path(&keys, value.clone());
                applied += 1;
            }
        }
        applied
    }

    /// Dotted paths required by `self` that `candidate` does not provide
    ///
    /// A leaf requirement is satisfied by any entry under the same key. A
    /// nested requirement needs a nested map in the candidate; otherwise the
    /// whole nested path is reported once.
    #[must_use]
    pub fn missing_keys(&self, candidate: &Self) -> Vec<String> {
        let mut missing = Vec::new();
        self.collect_missing("", candidate, &mut missing);
        missing
    }

    fn collect_missing(&self, prefix: &str, candidate: &Self, missing: &mut Vec<String>) {
        for (key, required) in &self.0 {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}{PATH_SEPARATOR}{key}")
            };
            match (required, candidate.0.get(key)) {
                (Value::Leaf(_), Some(_)) => {}
                (Value::Node(nested), Some(Value::Node(provided))) => {
                    nested.collect_missing(&path, provided, missing);
                }
                _ => missing.push(path),
            }
        }
    }

    /// Parse a values document
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or is not a mapping. Nested
    /// sequences, empty nested mappings and non-scalar keys are rejected too.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Serialize as a YAML document
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    fn from_mapping(mapping: serde_yaml::Mapping) -> Result<Self, String> {
        let mut values = Self::new();
        for (key, value) in mapping {
            let key = scalar_to_string(&key).ok_or_else(|| "mapping keys must be scalars".to_owned())?;
            let value = match value {
                serde_yaml::Value::Mapping(nested) if nested.is_empty() => {
                    return Err(format!("value for '{key}' is an empty mapping, which is not supported"));
                }
                serde_yaml::Value::Mapping(nested) => Value::Node(Self::from_mapping(nested)?),
                serde_yaml::Value::Sequence(_) => {
                    return Err(format!("value for '{key}' is a sequence, which is not supported"));
                }
                serde_yaml::Value::Tagged(tagged) => {
                    return Err(format!("value for '{key}' is tagged ({}), which is not supported", tagged.tag));
                }
                ref scalar => Value::Leaf(scalar_to_string(scalar).unwrap_or_default()),
            };
            values.0.insert(key, value);
        }
        Ok(values)
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match *value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(ref n) => Some(n.to_string()),
        serde_yaml::Value::String(ref s) => Some(s.clone()),
        serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_)
        | serde_yaml::Value::Tagged(_) => None,
    }
}

impl<'de> Deserialize<'de> for TemplateValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::Mapping(mapping) => {
                Self::from_mapping(mapping).map_err(de::Error::custom)
            }
            serde_yaml::Value::Null => Ok(Self::new()),
            _ => Err(de::Error::custom("values document must be a mapping")),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Missing { ref path } => write!(f, "map has no entry for key \"{path}\""),
            Self::NotALeaf { ref path } => write!(f, "value at \"{path}\" is a map, not a string"),
            Self::NotANode { ref path } => {
                write!(f, "value at \"{path}\" is a string and has no nested keys")
            }
        }
    }
}

impl FromIterator<(String, Value)> for TemplateValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}
