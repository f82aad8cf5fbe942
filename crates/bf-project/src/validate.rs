//! Diagram file validation, run before any block is built.

use std::collections::{HashMap, HashSet};

use crate::schema::{DiagramFile, PortSpec};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_file(file: &DiagramFile) -> Result<(), ValidationError> {
    if file.version == 0 || file.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: file.version,
        });
    }

    let mut block_ids = HashSet::new();
    for block in &file.blocks {
        if block.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "block id".to_string(),
                value: block.id.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if !block_ids.insert(block.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: block.id.clone(),
                context: "blocks".to_string(),
            });
        }
    }

    let mut driven: HashMap<(String, usize), &str> = HashMap::new();
    for wire in &file.wires {
        let from: PortSpec = wire.from.parse()?;
        let to: PortSpec = wire.to.parse()?;
        for (end, context) in [(&from, "wire source"), (&to, "wire destination")] {
            if !block_ids.contains(end.block.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: end.block.clone(),
                    context: format!("{context} '{}'", wire_label(&wire.from, &wire.to)),
                });
            }
        }
        if let Some(prev) = driven.insert((to.block.clone(), to.port), wire.from.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: to.to_string(),
                context: format!("wire destinations (already driven by {prev})"),
            });
        }
    }

    if let Some(sim) = &file.sim {
        if let Err(err) = sim.validate() {
            return Err(ValidationError::InvalidValue {
                field: "sim".to_string(),
                value: format!("dt={}, t_end={}", sim.dt, sim.t_end),
                reason: err.to_string(),
            });
        }
    }

    Ok(())
}

fn wire_label(from: &str, to: &str) -> String {
    format!("{from} -> {to}")
}
