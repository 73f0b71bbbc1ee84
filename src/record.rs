// src/record.rs
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// One CSV row keyed by column name, in header order.
///
/// A value is `None` when the data line had fewer fields than the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

impl Record {
    /// Pair `keys` with `values` by position.
    /// Missing values become `None`; surplus values are dropped.
    pub fn zip<'a, K, V>(keys: K, values: V) -> Self
    where
        K: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut values = values.into_iter();
        let mut record = Record::default();
        for key in keys {
            record.insert(key.to_string(), values.next().map(str::to_string));
        }
        record
    }

    /// Insert or overwrite; an existing key keeps its original position.
    pub fn insert(&mut self, key: String, value: Option<String>) {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    /// `None` if the column is unknown, `Some(None)` if it is known but had no value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Latest record per file name, in directory enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: Vec<(String, Record)>,
    /// file name -> position in `entries`
    index: HashMap<String, usize>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: String, record: Record) {
        match self.index.get(&file_name) {
            Some(&pos) => self.entries[pos].1 = record,
            None => {
                self.index.insert(file_name.clone(), self.entries.len());
                self.entries.push((file_name, record));
            }
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&Record> {
        self.index.get(file_name).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.index.contains_key(file_name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(name, r)| (name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, record) in &self.entries {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}
