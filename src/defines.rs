//! Definition table - insertion-ordered `#define` storage
//!
//! `build_definitions` pulls every line-anchored `#define NAME VALUE` out of
//! the flattened document. A directive absorbs the blank lines that follow
//! it. Later definitions of a name overwrite earlier ones in place.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use tracing::debug;

/// `#define NAME VALUE`, plus any directly following line breaks
static DEFINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^#define (\w+) (.+)(?:\r?\n?)+").expect("define pattern is valid")
});

/// A single macro value and whether it has been expanded yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub value: String,
    pub resolved: bool,
}

impl Definition {
    pub fn raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            resolved: false,
        }
    }
}

/// Name -> value, iterated in first-definition order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionTable {
    entries: IndexMap<String, Definition>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a raw definition
    ///
    /// An overwritten name keeps its original position.
    pub fn define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        debug!(name = %name, value = %value, "Stored definition");
        self.entries.insert(name, Definition::raw(value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|d| d.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|d| d.resolved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// (name, value) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, def)| (name.as_str(), def.value.as_str()))
    }

    pub(crate) fn entry(&self, name: &str) -> Option<&Definition> {
        self.entries.get(name)
    }

    /// Store the expanded value and mark the entry resolved
    pub(crate) fn mark_resolved(&mut self, name: &str, value: String) {
        if let Some(def) = self.entries.get_mut(name) {
            def.value = value;
            def.resolved = true;
        }
    }

    /// Debug dump: one `NAME := VALUE` line per entry, `:=` aligned
    pub fn render_aligned(&self) -> String {
        let width = self.names().map(|n| n.chars().count()).max().unwrap_or(0);
        let mut out = String::new();
        for (name, value) in self.iter() {
            out.push_str(&format!("{:<width$} := {}\n", name, value, width = width));
        }
        out
    }

    /// Debug dump as a JSON object (keys in insertion order)
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for DefinitionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Strip every `#define` directive out of `text` and collect the table
pub fn build_definitions(text: &str) -> (String, DefinitionTable) {
    let mut table = DefinitionTable::new();
    let mut stripped = String::with_capacity(text.len());
    let mut last = 0;

    for caps in DEFINE_PATTERN.captures_iter(text) {
        let (Some(whole), Some(name), Some(value)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        stripped.push_str(&text[last..whole.start()]);
        table.define(name.as_str(), value.as_str().trim());
        last = whole.end();
    }
    stripped.push_str(&text[last..]);

    debug!(count = table.len(), "Collected definitions");
    (stripped, table)
}
