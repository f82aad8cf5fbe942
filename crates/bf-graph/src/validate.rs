//! Compile-time diagram validation.
//!
//! Problems are collected, not reported on first failure, so one compile
//! surfaces every offending block.

use tracing::warn;

use crate::block::Block;
use crate::diagram::Diagram;
use crate::error::ValidationIssue;

pub(crate) fn collect_issues(diagram: &Diagram) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if diagram.blocks().is_empty() {
        issues.push(ValidationIssue::EmptyDiagram);
        return issues;
    }

    for node in diagram.blocks() {
        // Every declared input needs exactly one driver; duplicates are
        // already rejected by `connect`.
        for port in 0..node.nin() {
            if diagram.input_wire(node.id(), port).is_none() {
                issues.push(ValidationIssue::UnconnectedInput {
                    block: node.label(),
                    port,
                });
            }
        }

        if let Block::Transfer(b) = node.block() {
            let found = b.initial_state().len();
            if found != b.nstates() {
                issues.push(ValidationIssue::StateLength {
                    block: node.label(),
                    expected: b.nstates(),
                    found,
                });
            }
        }

        if let Err(err) = node.block().check() {
            issues.push(ValidationIssue::Check {
                block: node.label(),
                reason: err.to_string(),
            });
        }
    }

    warn_unused_outputs(diagram);
    issues
}

/// Unconnected outputs are legal but usually a wiring mistake.
fn warn_unused_outputs(diagram: &Diagram) {
    for node in diagram.blocks() {
        for port in 0..node.nout() {
            let used = diagram
                .output_wires(node.id())
                .any(|w| w.start().port == port);
            if !used {
                warn!(block = %node.label(), port, "output port is not connected");
            }
        }
    }
}
