//! Diagram construction and compilation errors.

use core::fmt;

use bf_core::{BlockId, WireId};
use thiserror::Error;

use crate::wire::PlugDir;

pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while building, compiling or exporting a diagram.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A port reference is outside the block's declared arity.
    #[error("Port index out of range: {dir} port {port} of {block} (arity {arity})")]
    PortIndex {
        block: String,
        port: usize,
        arity: usize,
        dir: PlugDir,
    },

    /// An input port already has an incoming wire.
    #[error("Input port {port} of {block} is already driven by wire.{existing}")]
    DuplicateConnection {
        block: String,
        port: usize,
        existing: WireId,
    },

    #[error("Block {id} does not exist in this diagram")]
    UnknownBlock { id: BlockId },

    /// Aggregate of every structural and parameter problem found at compile.
    #[error("Diagram validation failed:\n{}", list_issues(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    /// A same-step dependency cycle with no transfer block to break it.
    #[error("Algebraic loop among blocks: {}", .blocks.join(", "))]
    AlgebraicLoop { ids: Vec<BlockId>, blocks: Vec<String> },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

fn list_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One problem found by compile-time validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A declared input port has no incoming wire.
    UnconnectedInput { block: String, port: usize },

    /// A block's own parameter check failed.
    Check { block: String, reason: String },

    /// Initial state length disagrees with the declared state dimension.
    StateLength {
        block: String,
        expected: usize,
        found: usize,
    },

    EmptyDiagram,
}

impl ValidationIssue {
    /// Label of the offending block, if the issue concerns one.
    pub fn block(&self) -> Option<&str> {
        match self {
            ValidationIssue::UnconnectedInput { block, .. }
            | ValidationIssue::Check { block, .. }
            | ValidationIssue::StateLength { block, .. } => Some(block),
            ValidationIssue::EmptyDiagram => None,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnconnectedInput { block, port } => {
                write!(f, "{block}: input port {port} is not connected")
            }
            ValidationIssue::Check { block, reason } => write!(f, "{block}: {reason}"),
            ValidationIssue::StateLength {
                block,
                expected,
                found,
            } => write!(
                f,
                "{block}: initial state has length {found}, expected {expected}"
            ),
            ValidationIssue::EmptyDiagram => write!(f, "diagram has no blocks"),
        }
    }
}

/// Every error found by one compile, reported together.
#[derive(Debug, Default)]
pub struct CompileErrors {
    errors: Vec<GraphError>,
}

impl CompileErrors {
    pub(crate) fn push(&mut self, err: GraphError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[GraphError] {
        &self.errors
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphError> {
        self.errors.iter()
    }

    /// Validation issues across all errors.
    pub fn validation_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().flat_map(|e| match e {
            GraphError::Validation { issues } => issues.as_slice(),
            _ => &[],
        })
    }

    /// Block ids of each algebraic loop found.
    pub fn algebraic_loops(&self) -> impl Iterator<Item = &[BlockId]> {
        self.errors.iter().filter_map(|e| match e {
            GraphError::AlgebraicLoop { ids, .. } => Some(ids.as_slice()),
            _ => None,
        })
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compile failed with {} error(s)", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

impl IntoIterator for CompileErrors {
    type Item = GraphError;
    type IntoIter = std::vec::IntoIter<GraphError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
