//! Query template registry.
//!
//! SQL lives outside the code in a two-level JSON document:
//!
//! ```json
//! { "users": { "get": "SELECT {} FROM users{}" } }
//! ```
//!
//! A template path is `<group>.<operation>`. Templates are loaded once at
//! startup and are read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DbError;

/// Query map bundled with the crate.
const BUILTIN_QUERIES: &str = include_str!("../queries/queries.json");

/// Raw two-level mapping as it appears in the source document.
type Groups = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// In-memory map from template path to SQL format string.
#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    groups: Groups,
}

impl QueryRegistry {
    /// Load templates from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the file cannot be read or is not a
    /// group -> operation -> value mapping.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let body = std::fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("cannot read query map {}: {e}", path.display()))
        })?;
        let registry = Self::parse(&body)?;
        tracing::info!(
            path = %path.display(),
            templates = registry.len(),
            "Query map loaded"
        );
        Ok(registry)
    }

    /// Parse templates from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the document is malformed.
    pub fn parse(json: &str) -> Result<Self, DbError> {
        let groups: Groups = serde_json::from_str(json)
            .map_err(|e| DbError::Config(format!("malformed query map: {e}")))?;
        Ok(Self { groups })
    }

    /// The query map shipped with this crate.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the bundled document is malformed.
    pub fn builtin() -> Result<Self, DbError> {
        Self::parse(BUILTIN_QUERIES)
    }

    /// Resolve `group.operation` to its template.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::TemplateNotFound`] if the path does not have
    /// exactly two segments, if either key is absent, or if the stored
    /// value is not a string.
    pub fn resolve(&self, path: &str) -> Result<&str, DbError> {
        let not_found = || DbError::TemplateNotFound(path.to_owned());
        let (group, operation) = path.split_once('.').ok_or_else(not_found)?;
        if operation.contains('.') {
            return Err(not_found());
        }
        self.groups
            .get(group)
            .and_then(|operations| operations.get(operation))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(not_found)
    }

    /// Number of entries across all groups, string-valued or not.
    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `group.operation` path in the registry, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = String> + '_ {
        self.groups.iter().flat_map(|(group, operations)| {
            operations
                .keys()
                .map(move |operation| format!("{group}.{operation}"))
        })
    }
}
