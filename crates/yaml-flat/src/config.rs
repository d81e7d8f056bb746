use core::fmt;
use core::hash::{Hash, Hasher};

use indexmap::{Equivalent, IndexMap};

/// A flattened configuration path such as `server:ports:0`.
///
/// Equality and hashing ignore case, so `Server:Port` and `server:port`
/// name the same entry.
#[derive(Debug, Clone)]
pub struct ConfigKey(String);

impl ConfigKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().flat_map(char::to_lowercase)
}

fn hash_folded<H: Hasher>(s: &str, state: &mut H) {
    for c in folded(s) {
        c.hash(state);
    }
    state.write_u8(0xff);
}

impl PartialEq for ConfigKey {
    fn eq(&self, other: &Self) -> bool {
        folded(&self.0).eq(folded(&other.0))
    }
}

impl Eq for ConfigKey {}

impl Hash for ConfigKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(&self.0, state);
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConfigKey {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ConfigKey {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// Borrowed lookup key that hashes like [`ConfigKey`].
struct KeyRef<'a>(&'a str);

impl Hash for KeyRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_folded(self.0, state);
    }
}

impl Equivalent<ConfigKey> for KeyRef<'_> {
    fn equivalent(&self, key: &ConfigKey) -> bool {
        folded(self.0).eq(folded(&key.0))
    }
}

/// The flattened document: path to value, with case-insensitive paths.
///
/// Writing a path that is already present replaces its value and keeps the
/// original spelling of the path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatConfig {
    entries: IndexMap<ConfigKey, Option<String>>,
}

impl FlatConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `path`, ignoring case. `None` if the path is absent.
    pub fn get(&self, path: &str) -> Option<&Option<String>> {
        self.entries.get(&KeyRef(path))
    }

    /// The value at `path` as `&str`, when the path exists and holds a value.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Option::as_deref)
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.entries.contains_key(&KeyRef(path))
    }

    /// Insert or replace the value at `path`. Returns the previous value.
    pub fn insert(
        &mut self,
        path: impl Into<ConfigKey>,
        value: Option<String>,
    ) -> Option<Option<String>> {
        self.entries.insert(path.into(), value)
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(ConfigKey::as_str)
    }
}

impl IntoIterator for FlatConfig {
    type Item = (ConfigKey, Option<String>);
    type IntoIter = indexmap::map::IntoIter<ConfigKey, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<ConfigKey>> FromIterator<(K, Option<String>)> for FlatConfig {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (path, value) in iter {
            config.insert(path, value);
        }
        config
    }
}
