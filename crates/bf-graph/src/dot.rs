//! Graphviz export.

use core::fmt;
use std::path::Path;

use crate::block::BlockClass;
use crate::diagram::Diagram;
use crate::error::{GraphError, GraphResult};

/// Graphviz rendering of a diagram, produced by [`Diagram::dot`].
///
/// Sources share the top rank and sinks the bottom one; edge labels show
/// `out -> in` port numbers when a block has more than one port.
pub struct Dot<'d>(&'d Diagram);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diagram = self.0;
        let title = diagram.name().unwrap_or("blockflow");
        writeln!(f, "digraph \"{}\" {{", escape(title))?;
        writeln!(f, "  rankdir=LR;")?;
        writeln!(f, "  node [fontname=\"Helvetica\"];")?;

        for node in diagram.blocks() {
            let shape = match node.class() {
                BlockClass::Source => "cds",
                BlockClass::Function => "box",
                BlockClass::Transfer => "box3d",
                BlockClass::Sink => "folder",
            };
            writeln!(
                f,
                "  b{} [label=\"{}\", shape={}];",
                node.id(),
                escape(&node.label()),
                shape
            )?;
        }

        for (class, rank) in [(BlockClass::Source, "source"), (BlockClass::Sink, "sink")] {
            let ids: Vec<String> = diagram
                .blocks()
                .iter()
                .filter(|n| n.class() == class)
                .map(|n| format!("b{}", n.id()))
                .collect();
            if !ids.is_empty() {
                writeln!(f, "  {{ rank={}; {}; }}", rank, ids.join("; "))?;
            }
        }

        for wire in diagram.wires() {
            let (start, end) = (wire.start(), wire.end());
            let multi_out = diagram.block(start.block).is_some_and(|n| n.nout() > 1);
            let multi_in = diagram.block(end.block).is_some_and(|n| n.nin() > 1);
            write!(f, "  b{} -> b{}", start.block, end.block)?;
            if multi_out || multi_in {
                write!(f, " [label=\"{} -> {}\"]", start.port, end.port)?;
            }
            writeln!(f, ";")?;
        }

        writeln!(f, "}}")
    }
}

impl Diagram {
    /// Graphviz view of the diagram, rendered through `Display`.
    pub fn dot(&self) -> Dot<'_> {
        Dot(self)
    }

    /// Render the diagram as a Graphviz digraph.
    pub fn to_dot(&self) -> String {
        self.dot().to_string()
    }

    /// Write the Graphviz rendering to `path`.
    pub fn dotfile(&self, path: impl AsRef<Path>) -> GraphResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_dot()).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
