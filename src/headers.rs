//! Case-insensitive request header map.
//!
//! Gateways flatten header capitalization into `HTTP_*` environment
//! variables, so lookups must be case-insensitive while the map still
//! reports a readable spelling when iterated.

use std::collections::HashMap;

/// Case-insensitive header map built from gateway variables.
///
/// Keys are stored lowercased alongside the first-seen spelling, so
/// `get("content-type")`, `get("Content-Type")` and `get("CONTENT-TYPE")`
/// all resolve to the same entry.
#[derive(Debug, Default, Clone)]
pub struct HeaderMap {
    entries: HashMap<String, (String, String)>,
}

impl HeaderMap {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a header map from `HTTP_*`-prefixed gateway variables.
    ///
    /// `HTTP_X_H_Test` becomes the header name `X-H-Test`; non-prefixed
    /// variables are ignored.
    #[must_use]
    pub fn from_gateway_vars(vars: &[(String, String)]) -> Self {
        let mut map = Self::new();
        for (key, value) in vars {
            if let Some(rest) = key.strip_prefix("HTTP_") {
                map.insert(&rest.replace('_', "-"), value.clone());
            }
        }
        map
    }

    /// Insert a header, replacing any existing entry with the same
    /// case-insensitive name.
    pub fn insert(&mut self, name: &str, value: String) {
        self.entries
            .insert(name.to_ascii_lowercase(), (name.to_string(), value));
    }

    /// Look up a header value, ignoring name case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }

    /// Whether a header is present, ignoring name case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs using the stored spelling.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
