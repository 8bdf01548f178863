//! Drive document model.
//!
//! A converged drive document looks like:
//!
//! ```json
//! {
//!   "drive": {
//!     "root": { "Notes": { "report.txt": "doc123" }, "Team": "sf1" },
//!     "filesData": { "doc123": { "title": "Report", "href": "/code/#/2/code/edit/..." } },
//!     "sharedFolders": { "sf1": { "lastTitle": "Team", "href": "/drive/#/2/drive/edit/..." } }
//!   }
//! }
//! ```
//!
//! Shared folder documents carry the same three tables at the top level,
//! without the `drive` wrapper. Both shapes are accepted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Metadata Types
// =============================================================================

/// Entry of the `filesData` table.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct FileMeta {
    /// Display title
    pub title: Option<String>,
    /// Edit link (relative to the server origin)
    pub href: Option<String>,
    /// Read-only link
    #[serde(rename = "roHref")]
    pub ro_href: Option<String>,
}

impl FileMeta {
    /// Read the typed fields out of a raw metadata object.
    pub fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }

    /// Best link to open the document with.
    pub fn link(&self) -> Option<&str> {
        self.href
            .as_deref()
            .filter(|h| !h.is_empty())
            .or(self.ro_href.as_deref().filter(|h| !h.is_empty()))
    }
}

/// Entry of the `sharedFolders` table.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SharedFolderMeta {
    /// Title declared when the folder was shared
    pub title: Option<String>,
    /// Last title seen from the folder itself
    #[serde(rename = "lastTitle")]
    pub last_title: Option<String>,
    /// Link to the shared folder's own drive
    pub href: Option<String>,
}

impl SharedFolderMeta {
    /// Read the typed fields out of a raw metadata object.
    pub fn from_value(value: &Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }

    /// Display title, preferring `lastTitle` over `title`.
    pub fn display_title(&self) -> Option<&str> {
        self.last_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.title.as_deref().filter(|t| !t.is_empty()))
    }
}

// =============================================================================
// Document View
// =============================================================================

/// Borrowed view over a converged drive document.
#[derive(Clone, Copy, Debug)]
pub struct DriveDoc<'a> {
    tables: &'a Map<String, Value>,
}

impl<'a> DriveDoc<'a> {
    /// Wrap a converged document. Returns `None` if it is not a JSON object.
    pub fn new(doc: &'a Value) -> Option<Self> {
        let top = doc.as_object()?;
        let tables = match top.get("drive") {
            Some(Value::Object(drive)) => drive,
            _ => top,
        };
        Some(Self { tables })
    }

    /// The folder tree root.
    pub fn root(&self) -> Option<&'a Map<String, Value>> {
        self.tables.get("root")?.as_object()
    }

    /// The `filesData` table.
    pub fn files_data(&self) -> Option<&'a Map<String, Value>> {
        self.tables.get("filesData")?.as_object()
    }

    /// The `sharedFolders` table.
    pub fn shared_folders(&self) -> Option<&'a Map<String, Value>> {
        self.tables.get("sharedFolders")?.as_object()
    }

    /// Metadata of a document by id.
    pub fn file(&self, id: &str) -> Option<&'a Value> {
        self.files_data()?.get(id)
    }

    /// Metadata of a shared folder by id.
    pub fn shared_folder(&self, id: &str) -> Option<&'a Value> {
        self.shared_folders()?.get(id)
    }

    /// Walk a chain of folder keys down from the root.
    ///
    /// Returns `None` as soon as a key is missing or names a non-folder.
    pub fn folder_at<S: AsRef<str>>(&self, keys: &[S]) -> Option<&'a Map<String, Value>> {
        let mut current = self.root()?;
        for key in keys {
            current = current.get(key.as_ref())?.as_object()?;
        }
        Some(current)
    }
}

/// String form of a leaf value, used as the metadata table key.
///
/// Ids are stored either as strings or as numbers.
pub fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
