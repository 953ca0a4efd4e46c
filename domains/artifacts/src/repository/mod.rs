//! Local storage for the Artifacts domain: the artifact file tree and the
//! alias registry kept next to it

pub mod locator;
pub mod registry;
pub mod resolver;

pub use locator::{FileLocator, SaveOutcome};
pub use registry::{Registry, REGISTRY_FILE_NAME};
pub use resolver::DependencyResolver;
