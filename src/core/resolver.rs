//! Name resolution inside a drive folder.
//!
//! A child of a folder is either a nested mapping (a folder) or an id that
//! points into `filesData` (a document) or `sharedFolders` (a mount of another
//! drive). Names are looked up by key first, then by display title.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::models::{DriveDoc, SharedFolderMeta, id_key};

/// Which title fallbacks apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupMode {
    /// `cd`: keys and shared-folder titles
    Navigate,
    /// `cat` / `info`: additionally document titles in the current folder
    Lookup,
}

/// A resolved child.
#[derive(Clone, Debug, PartialEq)]
pub enum Entry<'a> {
    /// A folder of the current drive, entered through `key`
    Folder {
        key: String,
        node: &'a Map<String, Value>,
    },
    /// A document
    File { id: String, meta: &'a Value },
    /// A mount of another drive
    SharedFolder { id: String, meta: &'a Value },
}

// =============================================================================
// Title Index
// =============================================================================

/// Title to id lookup for one document snapshot.
///
/// Equivalent to scanning the metadata tables in document order; the first
/// entry carrying a title wins.
#[derive(Clone, Debug, Default)]
pub struct TitleIndex {
    shared: HashMap<String, String>,
    files: HashMap<String, Vec<String>>,
}

impl TitleIndex {
    /// Index the metadata tables of `doc`.
    pub fn build(doc: DriveDoc<'_>) -> Self {
        let mut index = Self::default();

        for (id, meta) in doc.shared_folders().into_iter().flatten() {
            if let Some(title) = SharedFolderMeta::from_value(meta).display_title() {
                index
                    .shared
                    .entry(title.to_string())
                    .or_insert_with(|| id.clone());
            }
        }

        for (id, meta) in doc.files_data().into_iter().flatten() {
            if let Some(title) = meta.get("title").and_then(Value::as_str) {
                index
                    .files
                    .entry(title.to_string())
                    .or_default()
                    .push(id.clone());
            }
        }

        index
    }

    /// First shared folder with this display title.
    pub fn shared_folder(&self, title: &str) -> Option<&str> {
        self.shared.get(title).map(String::as_str)
    }

    /// All documents with this title, in table order.
    pub fn files(&self, title: &str) -> &[String] {
        self.files.get(title).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All shared folder titles.
    pub fn shared_titles(&self) -> impl Iterator<Item = &str> {
        self.shared.keys().map(String::as_str)
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves names against one drive document.
pub struct EntryResolver<'a> {
    doc: DriveDoc<'a>,
    titles: &'a TitleIndex,
}

impl<'a> EntryResolver<'a> {
    pub fn new(doc: DriveDoc<'a>, titles: &'a TitleIndex) -> Self {
        Self { doc, titles }
    }

    /// Title index of the document being resolved against.
    pub fn titles(&self) -> &'a TitleIndex {
        self.titles
    }

    /// Classify a child value found under `key`.
    ///
    /// Returns `None` for dangling ids and for values that are neither
    /// mappings nor ids.
    pub fn classify(&self, key: &str, value: &'a Value) -> Option<Entry<'a>> {
        if let Value::Object(node) = value {
            return Some(Entry::Folder {
                key: key.to_string(),
                node,
            });
        }

        let id = id_key(value)?;
        if let Some(meta) = self.doc.file(&id) {
            return Some(Entry::File { id, meta });
        }
        if let Some(meta) = self.doc.shared_folder(&id) {
            return Some(Entry::SharedFolder { id, meta });
        }
        None
    }

    /// Resolve `name` inside `container`.
    pub fn resolve(
        &self,
        container: &'a Map<String, Value>,
        name: &str,
        mode: LookupMode,
    ) -> Option<Entry<'a>> {
        if let Some(value) = container.get(name) {
            return self.classify(name, value);
        }

        if let Some(id) = self.titles.shared_folder(name) {
            if let Some(meta) = self.doc.shared_folder(id) {
                return Some(Entry::SharedFolder {
                    id: id.to_string(),
                    meta,
                });
            }
        }

        if mode == LookupMode::Lookup {
            let candidates = self.titles.files(name);
            if candidates.is_empty() {
                return None;
            }
            // Folders are mappings, so only leaf ids of this container count.
            let here: HashSet<String> = container.values().filter_map(id_key).collect();
            for id in candidates {
                if here.contains(id) {
                    if let Some(meta) = self.doc.file(id) {
                        return Some(Entry::File {
                            id: id.clone(),
                            meta,
                        });
                    }
                }
            }
        }

        None
    }
}
