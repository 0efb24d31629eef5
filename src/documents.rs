//! Loading of an exported archive into a flat, read-only set of JSON-LD nodes.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::jsonld::{has_type, resolve_str};

/// Every top-level JSON document found in an archive, in discovery order.
///
/// Identifiers are not required to be unique; lookups return the first match.
#[derive(Debug, Default, Clone)]
pub struct DocumentSet {
    documents: Vec<Value>,
}

impl DocumentSet {
    pub fn new(documents: impl IntoIterator<Item = Value>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    /// Recursively loads every `*.json` file under `dir` (the current
    /// directory when `None`).
    ///
    /// Files that cannot be read or parsed are logged and skipped, so loading
    /// never fails; an archive without JSON files yields an empty set.
    pub fn load_from_dir(dir: Option<&Path>) -> Self {
        let root = dir.unwrap_or_else(|| Path::new("."));
        info!(path = %root.display(), "Loading ActivityStreams documents");

        let mut documents = Vec::new();
        for entry_res in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry_res {
                Ok(entry) => entry,
                Err(e) => {
                    error!(error = %e, "Problem walking archive directory. Skipping...");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some("json")
            {
                continue;
            }

            debug!(path = %path.display(), "Loading file");
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Problem reading file. Skipping...");
                    continue;
                }
            };
            match serde_json::from_str::<Value>(&content) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Problem decoding file as JSON. Skipping...");
                }
            }
        }

        info!(documents = documents.len(), "Finished loading documents");
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.documents.iter()
    }

    /// First top-level document whose `id` (or `@id`) equals `id`.
    ///
    /// Only local documents are searched; remote identifiers are never fetched.
    pub fn find_by_id(&self, id: &str) -> Option<&Value> {
        self.documents
            .iter()
            .find(|doc| resolve_str(doc, "id") == Some(id))
    }

    /// Ids of all `Person` documents, in document order.
    ///
    /// Every call starts a fresh pass. Persons without a string id are skipped.
    pub fn find_persons(&self) -> impl Iterator<Item = &str> + '_ {
        self.documents
            .iter()
            .filter(|doc| has_type(doc, "Person"))
            .filter_map(|doc| resolve_str(doc, "id"))
    }
}
