//! Artifacts domain: dashboards, visualizations, saved searches and index patterns
//!
//! - `domain`: the artifact envelope, its metadata and the references it embeds
//! - `repository`: the on-disk tree (locator), dependency resolution and the
//!   alias registry

pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Artifact, ArtifactMeta, ArtifactRef, ArtifactType, Panel};
pub use domain::references::extract_references;

// Re-export repository types
pub use repository::{DependencyResolver, FileLocator, Registry, SaveOutcome, REGISTRY_FILE_NAME};
