//! Archivist
//!
//! Moves artifacts between the remote store and the local tree of one
//! root folder, and keeps that root's alias registry.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{instrument, Span};

use dashvault_artifacts::{
    Artifact, ArtifactMeta, ArtifactType, DependencyResolver, FileLocator, Registry, SaveOutcome,
};
use dashvault_common::{is_empty_json, load_json, Error, Result};
use dashvault_kibana::{ArtifactStore, ImportReport};

/// How an artifact is designated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    ById {
        artifact_type: ArtifactType,
        id: String,
    },
    ByTitle {
        artifact_type: ArtifactType,
        title: String,
    },
    ByAlias(String),
}

impl Target {
    pub fn id(artifact_type: ArtifactType, id: impl Into<String>) -> Self {
        Target::ById {
            artifact_type,
            id: id.into(),
        }
    }

    pub fn title(artifact_type: ArtifactType, title: impl Into<String>) -> Self {
        Target::ByTitle {
            artifact_type,
            title: title.into(),
        }
    }

    pub fn alias(alias: impl Into<String>) -> Self {
        Target::ByAlias(alias.into())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::ById { artifact_type, id } => write!(f, "{} with id {}", artifact_type, id),
            Target::ByTitle {
                artifact_type,
                title,
            } => write!(f, "{} with title {}", artifact_type, title),
            Target::ByAlias(alias) => write!(f, "alias {}", alias),
        }
    }
}

/// What an import from disk did
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Files sent to the store, in import order
    Imported {
        files: Vec<PathBuf>,
        report: ImportReport,
    },
    /// The target file had no content
    Skipped { path: PathBuf },
}

/// What populating the registry did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    /// `(alias, id)` of every entry written
    pub added: Vec<(String, String)>,
    /// Ids left alone because another alias already held them
    pub duplicates: Vec<String>,
}

pub struct Archivist {
    store: Box<dyn ArtifactStore>,
    locator: FileLocator,
    resolver: DependencyResolver,
    registry: Registry,
    span: Span,
}

impl Archivist {
    /// Compose an archivist over `root`, opening (or creating) its registry
    pub fn new(store: Box<dyn ArtifactStore>, root: &Path) -> Result<Self> {
        let span = tracing::info_span!("archivist", root = %root.display());
        let locator =
            FileLocator::new(root).with_span(tracing::info_span!(parent: &span, "locator"));
        let resolver = DependencyResolver::new(locator.clone())
            .with_span(tracing::info_span!(parent: &span, "resolver"));
        let registry = Registry::open_in(root, tracing::info_span!(parent: &span, "registry"))?;

        Ok(Self {
            store,
            locator,
            resolver,
            registry,
            span,
        })
    }

    pub fn root(&self) -> &Path {
        self.locator.root()
    }

    /// Import the artifact designated by `target` from disk to the store.
    ///
    /// With `find` the files it depends on are imported first, in
    /// dependency order. Existing store objects are only overwritten
    /// when `force` is set.
    #[instrument(parent = &self.span, skip(self))]
    pub async fn import_from_disk(
        &self,
        target: &Target,
        find: bool,
        force: bool,
    ) -> Result<ImportOutcome> {
        let (artifact_type, path) = self.locate(target)?;

        if is_empty_json(&load_json(&path)?) {
            tracing::warn!(path = %path.display(), "File is empty, nothing imported");
            return Ok(ImportOutcome::Skipped { path });
        }

        let files = if find {
            if artifact_type == ArtifactType::IndexPattern {
                let cause = format!("Find not supported for {}", artifact_type);
                tracing::error!("{}", cause);
                return Err(Error::Import(cause));
            }
            self.resolver.resolve(&path)?
        } else {
            tracing::info!("Related files not looked up");
            vec![path]
        };

        let report = self.import_files(&files, force).await?;
        Ok(ImportOutcome::Imported { files, report })
    }

    /// Export the artifact designated by `target` from the store to disk.
    ///
    /// Every returned object is written to its canonical file; existing
    /// files are kept unless `force` is set. With `with_index_pattern` the
    /// index pattern each object declares is fetched and saved too.
    #[instrument(parent = &self.span, skip(self))]
    pub async fn export_to_disk(
        &self,
        target: &Target,
        force: bool,
        with_index_pattern: bool,
    ) -> Result<Vec<SaveOutcome>> {
        let objects = match target {
            Target::ById { artifact_type, id } => self.store.export_by_id(*artifact_type, id).await?,
            Target::ByTitle {
                artifact_type,
                title,
            } => self.store.export_by_title(*artifact_type, title).await?,
            Target::ByAlias(alias) => {
                let meta = self.registry.find(alias)?.clone();
                self.store.export_by_id(meta.artifact_type, &meta.id).await?
            }
        };

        tracing::info!(count = objects.len(), "Exporting objects");
        let mut saved = Vec::with_capacity(objects.len());
        for object in objects {
            if let Err(e) = object.artifact_type() {
                tracing::warn!(id = %object.id, error = %e, "Object not exported");
                continue;
            }
            saved.push(self.locator.save_artifact(&object, force)?);

            if with_index_pattern {
                saved.extend(self.export_index_pattern(&object, force).await?);
            }
        }
        Ok(saved)
    }

    /// Metadata of every artifact file under the root; empty files are skipped
    #[instrument(parent = &self.span, skip(self))]
    pub fn inspect_local(&self) -> Result<Vec<ArtifactMeta>> {
        let mut metas = Vec::new();
        for item in self.locator.find_all()? {
            match item {
                Ok((_, artifact)) => metas.push(ArtifactMeta::from_artifact(&artifact)?),
                Err(e) if e.is_skippable() => tracing::warn!("{}", e),
                Err(e) => return Err(e),
            }
        }
        Ok(metas)
    }

    /// Metadata of every store object of a known artifact type
    #[instrument(parent = &self.span, skip(self))]
    pub async fn inspect_remote(&self) -> Result<Vec<ArtifactMeta>> {
        let objects = self.store.find_all().await?;
        let metas = objects
            .iter()
            .filter(|object| object.artifact_type().is_ok())
            .map(ArtifactMeta::from_artifact)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(total = objects.len(), kept = metas.len(), "Remote objects inspected");
        Ok(metas)
    }

    /// Register every remote artifact.
    ///
    /// Artifacts already registered are overwritten in place with `force`
    /// and reported as duplicates otherwise.
    #[instrument(parent = &self.span, skip(self))]
    pub async fn populate_registry(&mut self, force: bool) -> Result<PopulateSummary> {
        let metas = self.inspect_remote().await?;

        let mut summary = PopulateSummary::default();
        for meta in metas {
            let id = meta.id.clone();
            match self.registry.add(meta, force) {
                Ok(alias) => summary.added.push((alias, id)),
                Err(Error::Duplicate(_)) => summary.duplicates.push(id),
                Err(e) => return Err(e),
            }
        }
        tracing::info!(
            added = summary.added.len(),
            duplicates = summary.duplicates.len(),
            "Registry populated"
        );
        Ok(summary)
    }

    pub fn query_registry(&self, alias: &str) -> Result<&ArtifactMeta> {
        self.registry.find(alias)
    }

    /// Registry entries in alias order, optionally restricted to one type name
    pub fn list_registry(&self, type_filter: Option<&str>) -> Result<Vec<(String, ArtifactMeta)>> {
        let type_filter = type_filter
            .map(str::parse::<ArtifactType>)
            .transpose()
            .inspect_err(|e| {
                let _enter = self.span.enter();
                tracing::error!("{}", e);
            })?;

        Ok(self
            .registry
            .find_all(type_filter)
            .map(|(alias, meta)| (alias.to_string(), meta.clone()))
            .collect())
    }

    pub fn update_registry(&mut self, alias: &str, new_alias: &str) -> Result<()> {
        self.registry.update(alias, new_alias)
    }

    pub fn delete_registry(&mut self, alias: &str) -> Result<ArtifactMeta> {
        self.registry.delete(alias)
    }

    pub fn clear_registry(&mut self) -> Result<()> {
        self.registry.clear()
    }

    /// Type and file of the artifact designated by `target`
    fn locate(&self, target: &Target) -> Result<(ArtifactType, PathBuf)> {
        match target {
            Target::ById { artifact_type, id } => {
                Ok((*artifact_type, self.locate_by_id(*artifact_type, id)?))
            }
            Target::ByTitle {
                artifact_type,
                title,
            } => {
                let folder = self.locator.folder_path(*artifact_type);
                Ok((
                    *artifact_type,
                    self.locator.find_by_content_title(&folder, title)?,
                ))
            }
            Target::ByAlias(alias) => {
                let meta = self.registry.find(alias)?;
                Ok((
                    meta.artifact_type,
                    self.locate_by_id(meta.artifact_type, &meta.id)?,
                ))
            }
        }
    }

    fn locate_by_id(&self, artifact_type: ArtifactType, id: &str) -> Result<PathBuf> {
        let folder = self.locator.folder_path(artifact_type);
        self.locator
            .find_by_name(&folder, &FileLocator::file_name_for(artifact_type, id))
    }

    async fn import_files(&self, files: &[PathBuf], force: bool) -> Result<ImportReport> {
        tracing::info!(count = files.len(), "Importing files");

        let mut report = ImportReport::default();
        for path in files {
            let objects = match Artifact::load_all(path) {
                Ok(objects) => objects,
                Err(Error::EmptyArtifact(_)) => {
                    tracing::warn!(path = %path.display(), "No objects in file");
                    continue;
                }
                Err(e) => return Err(e),
            };
            tracing::info!(path = %path.display(), objects = objects.len(), "Importing file");
            report.merge(self.store.import_objects(objects, force).await?);
        }
        Ok(report)
    }

    async fn export_index_pattern(&self, object: &Artifact, force: bool) -> Result<Option<SaveOutcome>> {
        let Some(index_pattern_id) = object.index_pattern_id()? else {
            tracing::debug!(id = %object.id, "No index pattern declared");
            return Ok(None);
        };

        tracing::info!(id = %object.id, index_pattern = %index_pattern_id, "Exporting index pattern too");
        let index_pattern = self
            .store
            .find_by_id(ArtifactType::IndexPattern, &index_pattern_id)
            .await?;
        Ok(Some(self.locator.save_artifact(&index_pattern, force)?))
    }
}
