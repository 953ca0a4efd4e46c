//! Reference extraction
//!
//! Reads the references an artifact embeds without touching the filesystem
//! or the network. References come back in the order they appear in the
//! artifact's data.

use dashvault_common::{Error, Result};

use super::entities::{Artifact, ArtifactRef, ArtifactType};

/// Extract the references embedded in `artifact`.
///
/// - dashboards: one reference per panel; a panel that is neither a
///   visualization nor a search fails with `Error::UnsupportedPanelType`
/// - visualizations: the saved search, then the index pattern, when declared
/// - searches: the index pattern, when declared
/// - index patterns: none
pub fn extract_references(artifact: &Artifact) -> Result<Vec<ArtifactRef>> {
    match artifact.artifact_type()? {
        ArtifactType::Dashboard => dashboard_references(artifact),
        ArtifactType::Visualization => {
            let mut refs = Vec::new();
            if let Some(search_id) = artifact.saved_search_id() {
                refs.push(ArtifactRef::new(ArtifactType::Search, search_id));
            }
            refs.extend(index_pattern_reference(artifact)?);
            Ok(refs)
        }
        ArtifactType::Search => Ok(index_pattern_reference(artifact)?.into_iter().collect()),
        ArtifactType::IndexPattern => Ok(Vec::new()),
    }
}

fn dashboard_references(dashboard: &Artifact) -> Result<Vec<ArtifactRef>> {
    dashboard
        .panels()?
        .into_iter()
        .map(|panel| match panel.panel_type.parse::<ArtifactType>() {
            Ok(t @ (ArtifactType::Visualization | ArtifactType::Search)) => {
                Ok(ArtifactRef::new(t, panel.id))
            }
            _ => {
                let cause = format!(
                    "Panel type {} not handled in dashboard {}",
                    panel.panel_type, dashboard.id
                );
                tracing::error!("{}", cause);
                Err(Error::UnsupportedPanelType(cause))
            }
        })
        .collect()
}

fn index_pattern_reference(artifact: &Artifact) -> Result<Option<ArtifactRef>> {
    Ok(artifact
        .index_pattern_id()?
        .map(|id| ArtifactRef::new(ArtifactType::IndexPattern, id)))
}
