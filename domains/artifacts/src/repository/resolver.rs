//! Dependency resolver
//!
//! Given the file of a starting artifact, produces the ordered list of
//! files that must be transferred with it: dependencies before the
//! artifacts referencing them, no path twice, the starting artifact last.

use std::path::{Path, PathBuf};

use dashvault_common::Result;
use indexmap::IndexSet;
use tracing::Span;

use crate::domain::entities::{Artifact, ArtifactType};
use crate::domain::references::extract_references;
use crate::repository::locator::FileLocator;

/// Resolves the transitive dependencies of artifacts stored under one root
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    locator: FileLocator,
    span: Span,
}

impl DependencyResolver {
    pub fn new(locator: FileLocator) -> Self {
        let span = tracing::info_span!("resolver", root = %locator.root().display());
        Self { locator, span }
    }

    /// Emit this resolver's events inside `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn locator(&self) -> &FileLocator {
        &self.locator
    }

    /// Resolve the files the artifact stored at `path` depends on.
    ///
    /// Any missing dependency file, unsupported panel or unreadable file
    /// aborts the whole resolution.
    pub fn resolve(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let _enter = self.span.enter();

        let artifact = Artifact::load(path)?;
        let mut resolved = IndexSet::new();
        self.collect(path, &artifact, &mut resolved)?;

        tracing::info!(path = %path.display(), files = resolved.len(), "Dependencies resolved");
        Ok(resolved.into_iter().collect())
    }

    /// Push the dependencies of `artifact`, then `path` itself, into `resolved`.
    ///
    /// Recursing straight into the shared set is the same as resolving a
    /// sub-list and splicing in its unseen entries: an insert of a path
    /// already present keeps its first position.
    fn collect(
        &self,
        path: &Path,
        artifact: &Artifact,
        resolved: &mut IndexSet<PathBuf>,
    ) -> Result<()> {
        let artifact_type = artifact.artifact_type()?;

        if artifact_type == ArtifactType::Dashboard
            && !self.locator.folder_exists(ArtifactType::Visualization)
        {
            tracing::info!(
                path = %path.display(),
                "Dependencies skipped, visualizations folder doesn't exist"
            );
            resolved.insert(path.to_path_buf());
            return Ok(());
        }

        for reference in extract_references(artifact)? {
            // A visualization's saved search is optional locally; every
            // other dependency must be on disk.
            if artifact_type == ArtifactType::Visualization
                && reference.artifact_type == ArtifactType::Search
                && !self.locator.folder_exists(ArtifactType::Search)
            {
                tracing::info!(
                    path = %path.display(),
                    dependency = %reference,
                    "Dependency skipped, {} folder doesn't exist",
                    reference.artifact_type
                );
                continue;
            }

            let folder = self.locator.folder_path(reference.artifact_type);
            let dependency_path = self.locator.find_by_name(&folder, &reference.file_name())?;
            if resolved.contains(&dependency_path) {
                continue;
            }

            let dependency = Artifact::load(&dependency_path)?;
            self.collect(&dependency_path, &dependency, resolved)?;
        }

        resolved.insert(path.to_path_buf());
        Ok(())
    }
}
