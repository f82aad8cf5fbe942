//! Error type for the command-line front end.

use std::path::PathBuf;

/// Wraps every backend error the CLI can hit.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Project error: {0}")]
    Project(#[from] bf_project::ProjectError),

    #[error("{0}")]
    Compile(#[from] bf_graph::CompileErrors),

    #[error("Graph error: {0}")]
    Graph(#[from] bf_graph::GraphError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] bf_sim::SimError),

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CliResult<T> = Result<T, CliError>;
