//! Chart values: values files merged in order, `--set` overrides on top

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{ChartError, Result};

/// Values tree handed to the renderer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load a values file. A missing file is treated as empty values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "values file not found, using empty values");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ChartError::ValuesFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&content).map_err(|e| ChartError::ValuesFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
            return Ok(Self::new());
        }
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        match value {
            JsonValue::Null => Ok(Self::new()),
            value => Ok(Self(value)),
        }
    }

    /// Deep merge `overlay` into these values
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Apply ordered `--set` arguments on top of these values
    pub fn apply_set(&mut self, set_args: &[String]) -> Result<()> {
        for arg in set_args {
            let invalid = || ChartError::InvalidSet { arg: arg.clone() };
            for (key, value) in split_assignments(arg).ok_or_else(invalid)? {
                let path = parse_key(&key).ok_or_else(invalid)?;
                set_path(&mut self.0, &path, value);
            }
        }
        Ok(())
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        path.split('.')
            .try_fold(&self.0, |current, key| current.as_object()?.get(key))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }
}

fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// One step of a `--set` key: `name` or `[index]`
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Upper bound for list indexes in `--set` keys
const MAX_INDEX: usize = 65536;

fn set_path(value: &mut JsonValue, path: &[Segment], new_value: JsonValue) {
    let Some((first, rest)) = path.split_first() else {
        *value = new_value;
        return;
    };

    match first {
        Segment::Key(key) => {
            if !value.is_object() {
                *value = JsonValue::Object(serde_json::Map::new());
            }
            if let JsonValue::Object(map) = value {
                let entry = map.entry(key.clone()).or_insert(JsonValue::Null);
                set_path(entry, rest, new_value);
            }
        }
        Segment::Index(index) => {
            if !value.is_array() {
                *value = JsonValue::Array(Vec::new());
            }
            if let JsonValue::Array(items) = value {
                if items.len() <= *index {
                    items.resize(index + 1, JsonValue::Null);
                }
                set_path(&mut items[*index], rest, new_value);
            }
        }
    }
}

/// Read up to the first unescaped `stops` character.
///
/// Returns the text and the stop character, `None` at end of input. With
/// `keep_escapes` the backslashes stay in the text for a later pass.
fn read_token(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    stops: &[char],
    keep_escapes: bool,
) -> (String, Option<char>) {
    let mut text = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if keep_escapes {
                text.push(c);
            }
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else if stops.contains(&c) {
            return (text, Some(c));
        } else {
            text.push(c);
        }
    }
    (text, None)
}

/// Split `a=1,b.c=2,list={x,y}` into its assignments
fn split_assignments(arg: &str) -> Option<Vec<(String, JsonValue)>> {
    let mut chars = arg.chars().peekable();
    let mut assignments = Vec::new();

    loop {
        let (key, stop) = read_token(&mut chars, &['=', ','], true);
        if stop != Some('=') || key.is_empty() {
            return None;
        }

        let (value, stop) = if chars.peek() == Some(&'{') {
            chars.next();
            let mut items = Vec::new();
            loop {
                let (item, stop) = read_token(&mut chars, &[',', '}'], false);
                match stop {
                    Some(',') => items.push(typed_value(&item)),
                    Some(_) => {
                        if !(item.is_empty() && items.is_empty()) {
                            items.push(typed_value(&item));
                        }
                        break;
                    }
                    None => return None,
                }
            }
            let stop = match chars.next() {
                None => None,
                Some(',') => Some(','),
                Some(_) => return None,
            };
            (JsonValue::Array(items), stop)
        } else {
            let (text, stop) = read_token(&mut chars, &[','], false);
            (typed_value(&text), stop)
        };

        assignments.push((key, value));
        if stop.is_none() {
            return Some(assignments);
        }
    }
}

/// Parse `a.b[0].c` into segments. `\.` keeps a literal dot in a name.
fn parse_key(key: &str) -> Option<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut expect_name = false;
    let mut chars = key.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                name.push(chars.next()?);
                expect_name = false;
            }
            '.' => {
                if name.is_empty() {
                    if !matches!(segments.last(), Some(Segment::Index(_))) {
                        return None;
                    }
                } else {
                    segments.push(Segment::Key(std::mem::take(&mut name)));
                }
                expect_name = true;
            }
            '[' => {
                if !name.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut name)));
                } else if segments.is_empty() || expect_name {
                    return None;
                }
                let mut digits = String::new();
                loop {
                    match chars.next()? {
                        ']' => break,
                        d => digits.push(d),
                    }
                }
                let index = digits.parse::<usize>().ok().filter(|i| *i < MAX_INDEX)?;
                segments.push(Segment::Index(index));
            }
            c => {
                name.push(c);
                expect_name = false;
            }
        }
    }

    if expect_name {
        return None;
    }
    if !name.is_empty() {
        segments.push(Segment::Key(name));
    }
    (!segments.is_empty()).then_some(segments)
}

/// Type a `--set` value: booleans, null and plain integers, anything else is text
fn typed_value(val: &str) -> JsonValue {
    match val {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        "null" => JsonValue::Null,
        "0" => JsonValue::Number(0.into()),
        _ if val.starts_with('0') => JsonValue::String(val.to_string()),
        _ => match val.parse::<i64>() {
            Ok(num) => JsonValue::Number(num.into()),
            Err(_) => JsonValue::String(val.to_string()),
        },
    }
}

/// Build values from ordered `--set` arguments. Later assignments win.
///
/// Each argument follows helm's grammar: comma separated `key=value` pairs,
/// dotted keys with `[N]` list indexes, `{a,b}` lists and `\` escapes.
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();
    values.apply_set(set_args)?;
    Ok(values)
}
