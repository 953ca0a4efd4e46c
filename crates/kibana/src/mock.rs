//! Mock Artifact Store Implementation
//!
//! Keeps objects in memory and records every import for test assertions.
//! Thread-safe via `Arc<Mutex<>>`.

use std::sync::{Arc, Mutex, MutexGuard};

use dashvault_artifacts::{extract_references, Artifact, ArtifactType};

use crate::{ArtifactStore, ImportReport, ImportedObject, StoreError};

/// One call to `import_objects`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedImport {
    pub objects: Vec<Artifact>,
    pub force: bool,
}

#[derive(Debug, Default)]
struct MockState {
    objects: Vec<Artifact>,
    imports: Vec<RecordedImport>,
}

/// In-memory artifact store.
///
/// Imports upsert into the stored objects, so an import followed by an
/// export sees the imported content.
#[derive(Debug, Clone, Default)]
pub struct MockArtifactStore {
    state: Arc<Mutex<MockState>>,
}

impl MockArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store pre-filled with objects.
    pub fn with_objects(objects: Vec<Artifact>) -> Self {
        let store = Self::new();
        for object in objects {
            store.insert(object);
        }
        store
    }

    /// Add or replace an object (matched on type and id).
    pub fn insert(&self, object: Artifact) {
        if let Ok(mut state) = self.lock() {
            upsert(&mut state.objects, object);
        }
    }

    /// Return all recorded imports.
    pub fn recorded_imports(&self) -> Vec<RecordedImport> {
        self.lock()
            .map(|state| state.imports.clone())
            .unwrap_or_default()
    }

    /// Return the stored objects.
    pub fn objects(&self) -> Vec<Artifact> {
        self.lock()
            .map(|state| state.objects.clone())
            .unwrap_or_default()
    }

    /// Drop all stored objects and recorded imports.
    pub fn reset(&self) {
        if let Ok(mut state) = self.lock() {
            state.objects.clear();
            state.imports.clear();
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Request(format!("mock store lock poisoned: {e}")))
    }

    fn get(
        state: &MockState,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Option<Artifact> {
        state
            .objects
            .iter()
            .find(|o| o.type_name == artifact_type.as_str() && o.id == id)
            .cloned()
    }

    /// Dashboard followed by every stored object it reaches.
    ///
    /// Fails like a real export when a reached object cannot be read.
    fn bundle(state: &MockState, dashboard: Artifact) -> Result<Vec<Artifact>, StoreError> {
        let mut bundle = vec![dashboard];
        let mut next = 0;
        while next < bundle.len() {
            let references = extract_references(&bundle[next])
                .map_err(|e| StoreError::Response(e.to_string()))?;
            for reference in references {
                let seen = bundle.iter().any(|o| {
                    o.type_name == reference.artifact_type.as_str() && o.id == reference.id
                });
                if seen {
                    continue;
                }
                if let Some(found) = Self::get(state, reference.artifact_type, &reference.id) {
                    bundle.push(found);
                }
            }
            next += 1;
        }
        Ok(bundle)
    }

    fn export(
        state: &MockState,
        found: Artifact,
        artifact_type: ArtifactType,
    ) -> Result<Vec<Artifact>, StoreError> {
        match artifact_type {
            ArtifactType::Dashboard => Self::bundle(state, found),
            _ => Ok(vec![found]),
        }
    }
}

fn upsert(objects: &mut Vec<Artifact>, object: Artifact) {
    match objects
        .iter_mut()
        .find(|o| o.type_name == object.type_name && o.id == object.id)
    {
        Some(existing) => *existing = object,
        None => objects.push(object),
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MockArtifactStore {
    async fn export_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Vec<Artifact>, StoreError> {
        let state = self.lock()?;
        let found = Self::get(&state, artifact_type, id).ok_or_else(|| {
            StoreError::NotFound(format!(
                "Impossible to export {} with id {}, not found",
                artifact_type, id
            ))
        })?;
        Self::export(&state, found, artifact_type)
    }

    async fn export_by_title(
        &self,
        artifact_type: ArtifactType,
        title: &str,
    ) -> Result<Vec<Artifact>, StoreError> {
        let state = self.lock()?;
        let found = state
            .objects
            .iter()
            .find(|o| o.type_name == artifact_type.as_str() && o.title() == Some(title))
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("No {} found with title: {}", artifact_type, title))
            })?;
        Self::export(&state, found, artifact_type)
    }

    async fn find_by_id(
        &self,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Result<Artifact, StoreError> {
        let state = self.lock()?;
        Self::get(&state, artifact_type, id).ok_or_else(|| {
            StoreError::NotFound(format!("No {} found with ID: {}", artifact_type, id))
        })
    }

    async fn import_objects(
        &self,
        objects: Vec<Artifact>,
        force: bool,
    ) -> Result<ImportReport, StoreError> {
        tracing::debug!(count = objects.len(), force, "Mock store: recording import");
        let mut state = self.lock()?;
        state.imports.push(RecordedImport {
            objects: objects.clone(),
            force,
        });

        let mut report = ImportReport::default();
        for object in objects {
            report.imported.push(ImportedObject {
                type_name: object.type_name.clone(),
                id: object.id.clone(),
            });
            upsert(&mut state.objects, object);
        }
        Ok(report)
    }

    async fn find_all(&self) -> Result<Vec<Artifact>, StoreError> {
        Ok(self.lock()?.objects.clone())
    }
}
