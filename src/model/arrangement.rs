//! Columns, whole-workspace arrangements and the filename-keyed document set.
//!
//! Both [`Arrangement`] and [`DocumentSet`] are JSON objects on the wire
//! whose key order carries meaning, so their serde impls walk the map
//! entries in order instead of going through a `HashMap`.
//!
//! A column keys its documents by id, so a column holding the same
//! document twice serializes with a repeated key. Most JSON readers keep
//! only the last entry; a warning is logged when that happens.

use super::Document;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An ordered workspace container holding documents.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Column {
    /// Column identifier
    pub id: String,

    /// Documents in visual order
    pub documents: Vec<Document>,
}

impl Column {
    /// Create an empty column.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            documents: Vec::new(),
        }
    }

    /// Add a document at the end of the column.
    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Check if the column holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document ids that occur more than once, in order of their second
    /// occurrence.
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut repeated = Vec::new();
        for doc in &self.documents {
            if !seen.insert(doc.id.as_str()) && !repeated.contains(&doc.id.as_str()) {
                repeated.push(doc.id.as_str());
            }
        }
        repeated
    }
}

/// Snapshot of every column, document and page at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arrangement {
    /// Columns in visual order
    pub columns: Vec<Column>,
}

impl Arrangement {
    /// Create an empty arrangement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column at the end.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Iterate over every document, column by column.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.columns.iter().flat_map(|c| c.documents.iter())
    }

    /// Total number of documents.
    pub fn document_count(&self) -> usize {
        self.documents().count()
    }

    /// Total number of pages across all documents.
    pub fn page_count(&self) -> usize {
        self.documents().map(|d| d.pages.len()).sum()
    }

    /// Find the first document with the given id.
    pub fn find_document(&self, id: &str) -> Option<&Document> {
        self.documents().find(|d| d.id == id)
    }

    /// Check if there are no documents at all.
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(Column::is_empty)
    }

    /// Flatten into a filename-keyed set suitable for materialization.
    pub fn to_document_set(&self) -> DocumentSet {
        let mut set = DocumentSet::new();
        for doc in self.documents() {
            set.insert(doc.filename(), doc.clone());
        }
        set
    }
}

impl Serialize for Arrangement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            let repeated = column.duplicate_ids();
            if !repeated.is_empty() {
                log::warn!(
                    "column {} repeats document ids {:?}; later entries shadow earlier ones",
                    column.id,
                    repeated
                );
            }
            map.serialize_entry(&column.id, &ColumnBody(&column.documents))?;
        }
        map.end()
    }
}

struct ColumnBody<'a>(&'a [Document]);

impl Serialize for ColumnBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for doc in self.0 {
            map.serialize_entry(&doc.id, doc)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Arrangement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(EntriesVisitor::<OrderedDocuments>::new())?;
        let columns = entries
            .into_iter()
            .map(|(id, OrderedDocuments(documents))| Column { id, documents })
            .collect();
        Ok(Arrangement { columns })
    }
}

/// Documents of one column, keyed by document id on the wire.
struct OrderedDocuments(Vec<Document>);

impl<'de> Deserialize<'de> for OrderedDocuments {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(EntriesVisitor::<Document>::new())?;
        let documents = entries
            .into_iter()
            .map(|(key, mut doc)| {
                if doc.id.is_empty() {
                    doc.id = key;
                }
                doc
            })
            .collect();
        Ok(OrderedDocuments(documents))
    }
}

/// Filename-keyed documents in insertion order.
///
/// This is the materialization input and the server's store format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentSet {
    entries: Vec<(String, Document)>,
}

impl DocumentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the document stored under `filename`.
    pub fn insert(&mut self, filename: impl Into<String>, document: Document) {
        let filename = filename.into();
        match self.entries.iter_mut().find(|(k, _)| *k == filename) {
            Some(entry) => entry.1 = document,
            None => self.entries.push((filename, document)),
        }
    }

    /// Look up a document by filename.
    pub fn get(&self, filename: &str) -> Option<&Document> {
        self.entries
            .iter()
            .find(|(k, _)| k == filename)
            .map(|(_, d)| d)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for DocumentSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (filename, doc) in &self.entries {
            map.serialize_entry(filename, doc)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DocumentSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(EntriesVisitor::<Document>::new())?;
        Ok(DocumentSet { entries })
    }
}

/// Collects map entries into a `Vec`, keeping their order.
struct EntriesVisitor<V> {
    marker: std::marker::PhantomData<V>,
}

impl<V> EntriesVisitor<V> {
    fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(entries)
    }
}
