//! Delimited key/value parameter strings.
//!
//! Scene, volume, and texture records carry their settings as a single
//! string of `key:value` entries joined by `!@`, for example
//! `TYPE:RGBA_FLOAT!@MAX_GREY:4.0`.

use std::collections::HashMap;
use std::str::FromStr;

/// Separator between entries.
pub const ENTRY_DELIMITER: &str = "!@";

/// Separator between a key and its value.
pub const KEY_VALUE_DELIMITER: char = ':';

/// Parsed parameter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a delimited parameter string.
    ///
    /// Each entry is split on its first `:`; key and value are trimmed.
    /// Empty entries and entries without a `:` are dropped. A repeated key
    /// keeps the last value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let map = raw
            .split(ENTRY_DELIMITER)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| entry.split_once(KEY_VALUE_DELIMITER))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .collect();
        Self(map)
    }

    /// Serialize back into the delimited form.
    ///
    /// Entries are emitted in key order so the output is deterministic.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
            .into_iter()
            .map(|(key, value)| format!("{key}{KEY_VALUE_DELIMITER}{value}"))
            .collect::<Vec<_>>()
            .join(ENTRY_DELIMITER)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a value, returning `None` when absent or unparsable.
    #[must_use]
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Float value of `key`, or `default` when absent or unparsable.
    #[must_use]
    pub fn get_f32(&self, key: &str, default: f32) -> f32 {
        self.parse_value(key).unwrap_or(default)
    }

    /// Integer value of `key`, or `default` when absent or unparsable.
    #[must_use]
    pub fn get_i32(&self, key: &str, default: i32) -> i32 {
        self.parse_value(key).unwrap_or(default)
    }

    /// Boolean value of `key`: `true` only for a case-insensitive `"true"`.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map_or(default, |v| v.eq_ignore_ascii_case("true"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
