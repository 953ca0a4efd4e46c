//! File locator
//!
//! Maps artifact types to folders of the local tree and finds artifact
//! files by name or by embedded title.

use std::path::{Path, PathBuf};

use dashvault_common::{save_json, Error, Result};
use tracing::Span;

use crate::domain::entities::{file_name_for, Artifact, ArtifactType, JSON_EXT};

/// Result of writing an artifact to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The file was (over)written
    Written(PathBuf),
    /// A file already existed and was left untouched
    Kept(PathBuf),
}

impl SaveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            SaveOutcome::Written(path) | SaveOutcome::Kept(path) => path,
        }
    }
}

/// Locates artifact files under one root folder
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
    span: Span,
}

impl FileLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let span = tracing::info_span!("locator", root = %root.display());
        Self { root, span }
    }

    /// Emit this locator's events inside `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder of an artifact type, without creating it
    pub fn folder_path(&self, artifact_type: ArtifactType) -> PathBuf {
        match artifact_type.folder_name() {
            Some(name) => self.root.join(name),
            None => self.root.clone(),
        }
    }

    /// Whether the folder of an artifact type exists
    pub fn folder_exists(&self, artifact_type: ArtifactType) -> bool {
        self.folder_path(artifact_type).is_dir()
    }

    /// Folder of an artifact type, created if absent
    pub fn folder_for(&self, artifact_type: ArtifactType) -> Result<PathBuf> {
        let folder = self.folder_path(artifact_type);
        std::fs::create_dir_all(&folder)?;
        Ok(folder)
    }

    /// Folder of an artifact type given by name; unknown names fail with `Error::UnknownType`
    pub fn folder_for_name(&self, type_name: &str) -> Result<PathBuf> {
        let artifact_type = type_name.parse().inspect_err(|e| {
            let _enter = self.span.enter();
            tracing::error!(error = %e, "Cannot build folder");
        })?;
        self.folder_for(artifact_type)
    }

    /// Name of the file an artifact is stored under
    pub fn file_name_for(artifact_type: ArtifactType, id: &str) -> String {
        file_name_for(artifact_type, id)
    }

    /// Find a file by exact name among the immediate files of `folder`
    pub fn find_by_name(&self, folder: &Path, name: &str) -> Result<PathBuf> {
        let _enter = self.span.enter();

        let found = json_files(folder)?
            .into_iter()
            .find(|path| path.file_name().is_some_and(|n| n == name));

        found.ok_or_else(|| {
            let cause = format!("File {} not found in {}", name, folder.display());
            tracing::error!("{}", cause);
            Error::NotFound(cause)
        })
    }

    /// Find the first file in `folder` whose embedded title equals `title`.
    ///
    /// A bundle file matches when one of its objects carries the title.
    /// Empty files and files that hold no artifact are skipped.
    pub fn find_by_content_title(&self, folder: &Path, title: &str) -> Result<PathBuf> {
        let _enter = self.span.enter();

        for path in json_files(folder)? {
            let artifacts = match Artifact::load_all(&path) {
                Ok(artifacts) => artifacts,
                Err(e @ (Error::EmptyArtifact(_) | Error::Serialization(_))) => {
                    tracing::warn!(path = %path.display(), "Skipped while looking up title: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if artifacts.iter().any(|artifact| artifact.title() == Some(title)) {
                return Ok(path);
            }
        }

        let cause = format!(
            "File with content title {} not found in {}",
            title,
            folder.display()
        );
        tracing::error!("{}", cause);
        Err(Error::NotFound(cause))
    }

    /// Write an artifact to its canonical location.
    ///
    /// An existing file is only replaced when `force` is set.
    pub fn save_artifact(&self, artifact: &Artifact, force: bool) -> Result<SaveOutcome> {
        let artifact_type = artifact.artifact_type()?;
        let folder = self.folder_for(artifact_type)?;
        let path = folder.join(file_name_for(artifact_type, &artifact.id));

        let _enter = self.span.enter();
        if path.exists() && !force {
            tracing::warn!(path = %path.display(), "Artifact already exists, it won't be overwritten");
            return Ok(SaveOutcome::Kept(path));
        }

        save_json(artifact, &path)?;
        tracing::info!(path = %path.display(), "Artifact saved");
        Ok(SaveOutcome::Written(path))
    }

    /// Every artifact stored under the root, recursively.
    ///
    /// Only files named after one of the known artifact types are
    /// considered; each file is loaded when the iterator reaches it and a
    /// bundle file yields each of its objects.
    pub fn find_all(&self) -> Result<impl Iterator<Item = Result<(PathBuf, Artifact)>>> {
        let mut paths = Vec::new();
        collect_artifact_files(&self.root, &mut paths)?;
        paths.sort();

        Ok(paths.into_iter().flat_map(|path| match Artifact::load_all(&path) {
            Ok(artifacts) => artifacts
                .into_iter()
                .map(|artifact| Ok((path.clone(), artifact)))
                .collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        }))
    }
}

/// Immediate `.json` files of a folder, sorted by name.
/// A missing folder is `Error::NotFound`.
fn json_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        let cause = format!("Folder {} not found", folder.display());
        tracing::error!("{}", cause);
        return Err(Error::NotFound(cause));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && has_json_ext(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn collect_artifact_files(folder: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_artifact_files(&path, out)?;
        } else if has_json_ext(&path) && has_type_prefix(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_json_ext(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(JSON_EXT))
}

fn has_type_prefix(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| {
            ArtifactType::ALL
                .iter()
                .any(|t| name.starts_with(&format!("{}_", t.as_str())))
        })
}
