//! Document tree values
//!
//! Manifests are parsed into [`Value`], a closed set of variants, so every
//! lookup in the resolver is an exhaustive match instead of a chain of
//! downcasts. Maps keep their source order.

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

/// Ordered string-keyed map of values
pub type Map = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Walk nested maps along `path`
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |current, key| current.get(key.as_ref()))
    }

    /// Interpret the value as a port number (`8080` or `"8080"`)
    pub fn as_port(&self) -> Option<u16> {
        match self {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value the way it should appear in an environment variable
    /// or a mounted file. Scalars print bare; lists and maps print as JSON.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

impl From<YamlValue> for Value {
    fn from(value: YamlValue) -> Self {
        match value {
            YamlValue::Null => Value::Null,
            YamlValue::Bool(b) => Value::Bool(b),
            YamlValue::Number(n) => Value::Number(n),
            YamlValue::String(s) => Value::String(s),
            YamlValue::Sequence(seq) => Value::List(seq.into_iter().map(Value::from).collect()),
            YamlValue::Mapping(mapping) => Value::Map(
                mapping
                    .into_iter()
                    .filter_map(|(k, v)| key_to_string(k).map(|k| (k, Value::from(v))))
                    .collect(),
            ),
            YamlValue::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// YAML allows scalar keys of any type; unquoted `8080:` or `true:` are still
/// meaningful ConfigMap keys, composite keys are not.
fn key_to_string(key: YamlValue) -> Option<String> {
    match key {
        YamlValue::String(s) => Some(s),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        YamlValue::Null | YamlValue::Sequence(_) | YamlValue::Mapping(_) => None,
    }
}

/// Typed field access on a [`Map`]
pub trait MapExt {
    fn str_field(&self, key: &str) -> Option<&str>;
    fn map_field(&self, key: &str) -> Option<&Map>;
    fn list_field(&self, key: &str) -> Option<&[Value]>;

    /// String-valued entries of a nested map, e.g. labels or selectors.
    /// Non-string values are dropped.
    fn string_map(&self, key: &str) -> BTreeMap<String, String>;
}

impl MapExt for Map {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn map_field(&self, key: &str) -> Option<&Map> {
        self.get(key).and_then(Value::as_map)
    }

    fn list_field(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    fn string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.map_field(key)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Split a Kubernetes field path into segments.
///
/// Supports plain dotted paths (`metadata.name`) and bracketed keys
/// (`metadata.labels['app.kubernetes.io/name']`). Returns `None` for
/// malformed paths: empty segments, unterminated brackets or quotes.
pub fn parse_field_path(path: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    // a bracketed key ends a segment on its own; the following '.' must not
    // then be treated as an empty segment
    let mut after_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() && !after_bracket {
                    return None;
                }
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                after_bracket = false;
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                } else if segments.is_empty() {
                    return None;
                }
                let quote = chars.next().filter(|q| *q == '\'' || *q == '"')?;
                let mut key = String::new();
                loop {
                    match chars.next()? {
                        q if q == quote => break,
                        other => key.push(other),
                    }
                }
                if chars.next()? != ']' {
                    return None;
                }
                segments.push(key);
                after_bracket = true;
            }
            other => {
                if after_bracket {
                    return None;
                }
                current.push(other);
            }
        }
    }

    if !current.is_empty() {
        segments.push(current);
    } else if !after_bracket {
        return None;
    }

    Some(segments)
}
