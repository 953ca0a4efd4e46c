//! Domain layer for Artifacts

pub mod entities;
pub mod references;
