//! Alias registry
//!
//! Maps short aliases to artifact metadata so users never have to type
//! opaque ids or exact titles. The registry lives in a `.registry` file
//! directly under the root folder:
//!
//! ```json
//! {
//!     "1": {"id": "Search:_pull_request:false", "title": "Search:_pull_request:false", "type": "search", "version": 1},
//!     "2": {"id": "8539ada0-9960-11e8-8771-a349686d998a", "title": "dockerhub", "type": "index-pattern", "version": 1}
//! }
//! ```
//!
//! The in-memory table is the single source of truth between load and
//! flush. Every successful mutation rewrites the whole file before
//! returning. There is no locking: callers serialize access to one root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashvault_common::{is_empty_json, load_json, save_json, Error, Result};
use tracing::Span;

use crate::domain::entities::{ArtifactMeta, ArtifactType};

/// Name of the registry file under the root folder
pub const REGISTRY_FILE_NAME: &str = ".registry";

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    entries: BTreeMap<String, ArtifactMeta>,
    span: Span,
}

impl Registry {
    /// Open the registry of `root`, creating an empty one on first access
    pub fn open(root: &Path) -> Result<Self> {
        let span = tracing::info_span!("registry", root = %root.display());
        Self::open_in(root, span)
    }

    /// Open the registry of `root`, emitting events inside `span`
    pub fn open_in(root: &Path, span: Span) -> Result<Self> {
        let path = root.join(REGISTRY_FILE_NAME);
        let entries = span.in_scope(|| load_or_create(root, &path))?;
        Ok(Self {
            path,
            entries,
            span,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata registered under `alias`
    pub fn find(&self, alias: &str) -> Result<&ArtifactMeta> {
        self.entries.get(alias).ok_or_else(|| self.alias_not_found(alias))
    }

    /// Every `(alias, meta)` pair, optionally restricted to one artifact type,
    /// in key order
    pub fn find_all(
        &self,
        type_filter: Option<ArtifactType>,
    ) -> impl Iterator<Item = (&str, &ArtifactMeta)> + '_ {
        self.entries
            .iter()
            .filter(move |(_, meta)| type_filter.map_or(true, |t| meta.artifact_type == t))
            .map(|(alias, meta)| (alias.as_str(), meta))
    }

    /// Alias already holding the artifact `id`, if any
    pub fn alias_of(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, meta)| meta.id == id)
            .map(|(alias, _)| alias.as_str())
    }

    /// Register `meta` under the next free numeric alias and return the alias.
    ///
    /// When another alias already holds `meta.id` this fails with
    /// `Error::Duplicate`, unless `force` is set: that entry is then
    /// overwritten in place and keeps its alias.
    pub fn add(&mut self, meta: ArtifactMeta, force: bool) -> Result<String> {
        let _enter = self.span.enter();

        if let Some(existing) = self.alias_of(&meta.id).map(str::to_string) {
            if !force {
                let cause = format!(
                    "Metadata for object {} already exists in the registry under alias {}",
                    meta.id, existing
                );
                tracing::error!("{}", cause);
                return Err(Error::Duplicate(cause));
            }

            let id = meta.id.clone();
            let previous = self.entries.insert(existing.clone(), meta);
            if let Err(e) = self.flush() {
                if let Some(previous) = previous {
                    self.entries.insert(existing.clone(), previous);
                }
                return Err(e);
            }
            tracing::info!(id = %id, alias = %existing, "Metadata already registered, alias overwritten");
            return Ok(existing);
        }

        let alias = self.next_alias();
        let id = meta.id.clone();
        self.entries.insert(alias.clone(), meta);
        if let Err(e) = self.flush() {
            self.entries.remove(&alias);
            return Err(e);
        }
        tracing::info!(id = %id, alias = %alias, "Metadata added to the registry");
        Ok(alias)
    }

    /// Rename `old_alias` to `new_alias`
    pub fn update(&mut self, old_alias: &str, new_alias: &str) -> Result<()> {
        let _enter = self.span.enter();

        if !self.entries.contains_key(old_alias) {
            return Err(self.alias_not_found(old_alias));
        }
        if self.entries.contains_key(new_alias) {
            let cause = format!("Alias {new_alias} already in use");
            tracing::error!("{}", cause);
            return Err(Error::Conflict(cause));
        }

        if let Some(meta) = self.entries.remove(old_alias) {
            self.entries.insert(new_alias.to_string(), meta);
        }
        if let Err(e) = self.flush() {
            if let Some(meta) = self.entries.remove(new_alias) {
                self.entries.insert(old_alias.to_string(), meta);
            }
            return Err(e);
        }
        tracing::info!(old_alias, new_alias, "Alias renamed");
        Ok(())
    }

    /// Remove `alias`, returning the metadata it held
    pub fn delete(&mut self, alias: &str) -> Result<ArtifactMeta> {
        let _enter = self.span.enter();

        let meta = self
            .entries
            .remove(alias)
            .ok_or_else(|| self.alias_not_found(alias))?;
        if let Err(e) = self.flush() {
            self.entries.insert(alias.to_string(), meta);
            return Err(e);
        }
        tracing::info!(alias, "Alias deleted");
        Ok(meta)
    }

    /// Remove every entry
    pub fn clear(&mut self) -> Result<()> {
        let _enter = self.span.enter();

        let previous = std::mem::take(&mut self.entries);
        if let Err(e) = self.flush() {
            self.entries = previous;
            return Err(e);
        }
        tracing::info!("Registry cleared");
        Ok(())
    }

    /// First numeric alias, counting up from `len + 1`, not yet taken
    fn next_alias(&self) -> String {
        let mut candidate = self.entries.len() + 1;
        while self.entries.contains_key(&candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    fn flush(&self) -> Result<()> {
        save_json(&self.entries, &self.path)?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "Registry saved");
        Ok(())
    }

    fn alias_not_found(&self, alias: &str) -> Error {
        let cause = format!("Alias {alias} not found in registry");
        self.span.in_scope(|| tracing::error!("{}", cause));
        Error::NotFound(cause)
    }
}

fn load_or_create(root: &Path, path: &Path) -> Result<BTreeMap<String, ArtifactMeta>> {
    if !path.exists() {
        std::fs::create_dir_all(root)?;
        save_json(&serde_json::json!({}), path)?;
        tracing::info!(path = %path.display(), "Registry created");
    }

    let content = load_json(path)?;
    if is_empty_json(&content) {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_value(content)?)
}
