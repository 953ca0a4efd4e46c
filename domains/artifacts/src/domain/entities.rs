//! Domain entities for the Artifacts domain
//!
//! Artifacts are stored and exchanged as loosely-typed documents. They are
//! modelled here as a typed envelope (`id`, `type`, `version`, `updated_at`)
//! around an opaque attribute map, with narrow accessors for the few nested
//! fields dependency resolution needs.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dashvault_common::{is_empty_json, load_json, Error, Result};

/// Extension shared by every artifact file
pub const JSON_EXT: &str = ".json";

const PANELS_ATTR: &str = "panelsJSON";
const SAVED_SEARCH_ATTR: &str = "savedSearchId";
const SAVED_OBJECT_META_ATTR: &str = "kibanaSavedObjectMeta";
const SEARCH_SOURCE_ATTR: &str = "searchSourceJSON";
const OBJECTS_KEY: &str = "objects";

/// Artifact type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    Dashboard,
    Visualization,
    Search,
    IndexPattern,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 4] = [
        ArtifactType::Dashboard,
        ArtifactType::Visualization,
        ArtifactType::Search,
        ArtifactType::IndexPattern,
    ];

    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Dashboard => "dashboard",
            ArtifactType::Visualization => "visualization",
            ArtifactType::Search => "search",
            ArtifactType::IndexPattern => "index-pattern",
        }
    }

    /// Subfolder of the root holding artifacts of this type.
    /// Dashboards live directly under the root.
    pub fn folder_name(&self) -> Option<&'static str> {
        match self {
            ArtifactType::Dashboard => None,
            ArtifactType::Visualization => Some("visualizations"),
            ArtifactType::Search => Some("searches"),
            ArtifactType::IndexPattern => Some("index-patterns"),
        }
    }
}

impl std::fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ArtifactType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownType(format!("Unknown type {s}")))
    }
}

/// Identifies an artifact without its content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub artifact_type: ArtifactType,
    pub id: String,
}

impl ArtifactRef {
    pub fn new(artifact_type: ArtifactType, id: impl Into<String>) -> Self {
        Self {
            artifact_type,
            id: id.into(),
        }
    }

    /// Name of the file the referenced artifact is stored in
    pub fn file_name(&self) -> String {
        file_name_for(self.artifact_type, &self.id)
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.artifact_type, self.id)
    }
}

/// Build the file name an artifact is stored under: `<type>_<id>.json`, lower-cased.
pub fn file_name_for(artifact_type: ArtifactType, id: &str) -> String {
    format!("{}_{}{}", artifact_type.as_str(), id, JSON_EXT).to_lowercase()
}

/// One entry of a dashboard's embedded panel list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    #[serde(rename = "type")]
    pub panel_type: String,
    pub id: String,
}

/// Raw artifact: identity envelope plus pass-through attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Any other top-level field, kept untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Artifact {
    /// Load an artifact from a JSON file.
    ///
    /// A file without content fails with `Error::EmptyArtifact`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = load_json(path)?;
        if is_empty_json(&content) {
            return Err(Error::EmptyArtifact(format!(
                "File {} is empty",
                path.display()
            )));
        }
        serde_json::from_value(content)
            .map_err(|e| invalid_json(format!("{}: {}", path.display(), e)))
    }

    /// Load every artifact a JSON file holds: the file's own artifact, or
    /// the members of an `{"objects": [...]}` bundle.
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        let content = load_json(path)?;
        if is_empty_json(&content) {
            return Err(Error::EmptyArtifact(format!(
                "File {} is empty",
                path.display()
            )));
        }

        let items = match content {
            Value::Object(mut map) if map.contains_key(OBJECTS_KEY) => match map.remove(OBJECTS_KEY) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(invalid_json(format!(
                        "{} of {} is not a list",
                        OBJECTS_KEY,
                        path.display()
                    )))
                }
            },
            other => vec![other],
        };
        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| invalid_json(format!("{}: {}", path.display(), e)))
            })
            .collect()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Typed artifact type, failing for types outside the four known kinds
    pub fn artifact_type(&self) -> Result<ArtifactType> {
        self.type_name.parse()
    }

    pub fn to_ref(&self) -> Result<ArtifactRef> {
        Ok(ArtifactRef::new(self.artifact_type()?, self.id.clone()))
    }

    /// Embedded title, if any
    pub fn title(&self) -> Option<&str> {
        self.attributes.get("title").and_then(Value::as_str)
    }

    /// Panels declared in the dashboard's JSON-encoded panel list
    pub fn panels(&self) -> Result<Vec<Panel>> {
        match self.attributes.get(PANELS_ATTR).and_then(Value::as_str) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                invalid_json(format!(
                    "{} of {} {}: {}",
                    PANELS_ATTR, self.type_name, self.id, e
                ))
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Saved search a visualization is built on
    pub fn saved_search_id(&self) -> Option<&str> {
        self.attributes.get(SAVED_SEARCH_ATTR).and_then(Value::as_str)
    }

    /// Index pattern declared in the search-source JSON
    pub fn index_pattern_id(&self) -> Result<Option<String>> {
        let raw = self
            .attributes
            .get(SAVED_OBJECT_META_ATTR)
            .and_then(|meta| meta.get(SEARCH_SOURCE_ATTR))
            .and_then(Value::as_str);

        let Some(raw) = raw else {
            return Ok(None);
        };

        let source: Value = serde_json::from_str(raw).map_err(|e| {
            invalid_json(format!(
                "{} of {} {}: {}",
                SEARCH_SOURCE_ATTR, self.type_name, self.id, e
            ))
        })?;
        Ok(source.get("index").and_then(Value::as_str).map(str::to_string))
    }
}

/// Serialization error carrying the document it came from
fn invalid_json(context: String) -> Error {
    Error::Serialization(serde_json::Error::io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        context,
    )))
}

/// Identity and freshness of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ArtifactMeta {
    /// Build metadata from a raw artifact
    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let artifact_type = artifact.artifact_type()?;
        let title = match artifact.title() {
            Some(title) => title.to_string(),
            None => {
                tracing::warn!(id = %artifact.id, artifact_type = %artifact_type, "Artifact has no title");
                String::new()
            }
        };

        Ok(Self {
            id: artifact.id.clone(),
            title,
            artifact_type,
            version: artifact.version,
            updated_at: artifact.updated_at,
        })
    }

    /// Build metadata from its registry serialization
    pub fn from_registry(entry: &Value) -> Result<Self> {
        Ok(serde_json::from_value(entry.clone())?)
    }

    pub fn to_ref(&self) -> ArtifactRef {
        ArtifactRef::new(self.artifact_type, self.id.clone())
    }

    pub fn file_name(&self) -> String {
        file_name_for(self.artifact_type, &self.id)
    }
}
