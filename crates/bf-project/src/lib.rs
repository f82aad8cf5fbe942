//! bf-project: diagram file format, validation and assembly.

pub mod build;
pub mod schema;
pub mod validate;

pub use build::{Assembled, build_diagram};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_file};

use std::path::Path;

use bf_core::BlockError;
use bf_graph::GraphError;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Block '{id}' ({kind}): {source}")]
    Block {
        id: String,
        kind: String,
        source: BlockError,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Unsupported file extension: {path}")]
    UnknownFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn from_yaml_str(content: &str) -> ProjectResult<DiagramFile> {
    let file: DiagramFile = serde_yaml::from_str(content)?;
    validate_file(&file)?;
    Ok(file)
}

pub fn from_json_str(content: &str) -> ProjectResult<DiagramFile> {
    let file: DiagramFile = serde_json::from_str(content)?;
    validate_file(&file)?;
    Ok(file)
}

pub fn load_yaml(path: &Path) -> ProjectResult<DiagramFile> {
    from_yaml_str(&std::fs::read_to_string(path)?)
}

pub fn save_yaml(path: &Path, file: &DiagramFile) -> ProjectResult<()> {
    validate_file(file)?;
    let content = serde_yaml::to_string(file)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<DiagramFile> {
    from_json_str(&std::fs::read_to_string(path)?)
}

pub fn save_json(path: &Path, file: &DiagramFile) -> ProjectResult<()> {
    validate_file(file)?;
    let content = serde_json::to_string_pretty(file)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, `.yaml`/`.yml` as YAML.
pub fn load(path: &Path) -> ProjectResult<DiagramFile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(path),
        Some("yaml" | "yml") => load_yaml(path),
        _ => Err(ProjectError::UnknownFormat {
            path: path.display().to_string(),
        }),
    }
}
