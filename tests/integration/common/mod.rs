#![allow(dead_code)]

//! Common test utilities and fixtures for integration tests
//!
//! - Saved object builders for the four artifact types
//! - Scratch roots holding a local artifact tree
//! - Archivist construction over the mock store or a Kibana URL

use std::path::{Path, PathBuf};

use dashvault_app::Archivist;
use dashvault_artifacts::{Artifact, FileLocator};
use dashvault_kibana::client::KibanaClient;
use dashvault_kibana::mock::MockArtifactStore;
use dashvault_kibana::StoreConfig;
use serde_json::{json, Value};

pub fn dashboard(id: &str, title: &str, panels: &[(&str, &str)]) -> Value {
    let panels: Vec<Value> = panels
        .iter()
        .map(|(t, id)| json!({"type": t, "id": id, "panelIndex": "1"}))
        .collect();
    json!({
        "id": id,
        "type": "dashboard",
        "version": 1,
        "updated_at": "2019-01-11T09:38:55.707Z",
        "attributes": {"title": title, "panelsJSON": Value::Array(panels).to_string()}
    })
}

pub fn visualization(id: &str, title: &str, search: Option<&str>, index_pattern: Option<&str>) -> Value {
    let mut attributes = json!({"title": title, "visState": "{}"});
    if let Some(search) = search {
        attributes["savedSearchId"] = json!(search);
    }
    if let Some(index_pattern) = index_pattern {
        attributes["kibanaSavedObjectMeta"] =
            json!({"searchSourceJSON": json!({"index": index_pattern}).to_string()});
    }
    json!({"id": id, "type": "visualization", "version": 1, "attributes": attributes})
}

pub fn search(id: &str, title: &str, index_pattern: &str) -> Value {
    json!({
        "id": id,
        "type": "search",
        "version": 1,
        "attributes": {
            "title": title,
            "kibanaSavedObjectMeta": {"searchSourceJSON": json!({"index": index_pattern}).to_string()}
        }
    })
}

pub fn index_pattern(id: &str, title: &str) -> Value {
    json!({"id": id, "type": "index-pattern", "version": 1, "attributes": {"title": title}})
}

/// Git dashboard: two visualizations sharing one index pattern, one of
/// them built on a saved search, plus a search panel
pub fn git_dashboard() -> Vec<Value> {
    vec![
        dashboard(
            "git-dash",
            "Git",
            &[("visualization", "commits"), ("visualization", "authors"), ("search", "git-search")],
        ),
        visualization("commits", "Commits", Some("git-search"), None),
        visualization("authors", "Authors", None, Some("git-ip")),
        search("git-search", "Git search", "git-ip"),
        index_pattern("git-ip", "git"),
    ]
}

pub fn artifacts(values: Vec<Value>) -> Vec<Artifact> {
    values
        .into_iter()
        .map(|v| Artifact::from_value(v).expect("valid saved object"))
        .collect()
}

/// Scratch root, optionally pre-filled with artifact files
pub struct TestRoot {
    dir: tempfile::TempDir,
}

impl TestRoot {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn with(values: Vec<Value>) -> Self {
        let root = Self::empty();
        let locator = FileLocator::new(root.path());
        for artifact in artifacts(values) {
            locator.save_artifact(&artifact, false).expect("artifact saved");
        }
        root
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn archivist(&self, store: &MockArtifactStore) -> Archivist {
        Archivist::new(Box::new(store.clone()), self.path()).expect("archivist")
    }

    pub fn kibana_archivist(&self, base_url: &str) -> Archivist {
        let client = KibanaClient::new(&StoreConfig {
            provider: "kibana".to_string(),
            base_url: base_url.to_string(),
            max_retries: 1,
            retry_backoff_ms: 1,
        })
        .expect("client");
        Archivist::new(Box::new(client), self.path()).expect("archivist")
    }
}

/// Ids of every object imported into the mock store, in call order
pub fn imported_ids(store: &MockArtifactStore) -> Vec<String> {
    store
        .recorded_imports()
        .into_iter()
        .flat_map(|import| import.objects)
        .map(|object| object.id)
        .collect()
}
