mod discovery;
mod layered_fs;

pub use discovery::{discover_extension_sources, ExtensionRequest, ExtensionSource};
pub use layered_fs::{DirEntry, LayeredFs};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtensionPlanError {
    #[error("extension id cannot be empty")]
    EmptyExtensionId,
    #[error("duplicate enabled extension id in request: {extension_id}")]
    DuplicateEnabledExtension { extension_id: String },
    #[error("enabled extension does not exist on disk: {extension_id} (searched {searched_dir})")]
    EnabledExtensionMissing {
        extension_id: String,
        searched_dir: PathBuf,
    },
    #[error("current extension does not exist on disk: {extension_id} (searched {searched_dir})")]
    CurrentExtensionMissing {
        extension_id: String,
        searched_dir: PathBuf,
    },
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
