//! Assemble a `Diagram` from a validated file.

use std::collections::BTreeMap;

use bf_blocks::BlockRegistry;
use bf_core::BlockId;
use bf_graph::{Diagram, PortRef};
use bf_sim::SimOptions;
use tracing::debug;

use crate::schema::{DiagramFile, PortSpec};
use crate::validate::validate_file;
use crate::{ProjectError, ProjectResult};

/// A diagram built from a file, with the file's block ids resolved.
#[derive(Debug)]
pub struct Assembled {
    pub diagram: Diagram,
    /// File block id to diagram block id.
    pub ids: BTreeMap<String, BlockId>,
    pub sim: SimOptions,
}

impl Assembled {
    pub fn block_id(&self, id: &str) -> Option<BlockId> {
        self.ids.get(id).copied()
    }
}

/// Build every block through `registry` and wire them up.
///
/// Blocks are added in file order, so diagram ids follow the file.
pub fn build_diagram(file: &DiagramFile, registry: &BlockRegistry) -> ProjectResult<Assembled> {
    validate_file(file)?;

    let mut diagram = Diagram::named(file.name.clone());
    let mut ids = BTreeMap::new();
    for def in &file.blocks {
        let block = registry
            .create(&def.kind, &def.params)
            .map_err(|source| ProjectError::Block {
                id: def.id.clone(),
                kind: def.kind.clone(),
                source,
            })?;
        let bid = diagram.add_named(def.display_name(), block);
        ids.insert(def.id.clone(), bid);
    }

    for wire in &file.wires {
        let from = resolve(&ids, wire.from.parse()?)?;
        let to = resolve(&ids, wire.to.parse()?)?;
        let wid = diagram.connect(from, to)?;
        if let Some(name) = &wire.name {
            diagram.rename_wire(wid, name.clone());
        }
    }

    debug!(
        name = %file.name,
        blocks = file.blocks.len(),
        wires = file.wires.len(),
        "diagram assembled"
    );
    Ok(Assembled {
        diagram,
        ids,
        sim: file.sim.clone().unwrap_or_default(),
    })
}

fn resolve(ids: &BTreeMap<String, BlockId>, spec: PortSpec) -> ProjectResult<PortRef> {
    let block = ids
        .get(&spec.block)
        .copied()
        .ok_or_else(|| crate::ValidationError::MissingReference {
            id: spec.block.clone(),
            context: "wires".to_string(),
        })?;
    Ok(PortRef::new(block, spec.port))
}
