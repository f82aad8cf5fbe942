//! Structural report: the blocks and wires of a diagram as a table.

use core::fmt;

use bf_core::{BlockId, Shape, WireId};

use crate::block::BlockClass;
use crate::compile::CompiledPlan;
use crate::diagram::Diagram;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockRow {
    pub id: BlockId,
    pub label: String,
    pub class: BlockClass,
    pub nin: usize,
    pub nout: usize,
    pub nstates: usize,
    /// Position in the execution order, when compiled.
    pub order: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WireRow {
    pub id: WireId,
    pub label: String,
    pub from: String,
    pub to: String,
    /// Shape fixed during the most recent run, if any.
    pub shape: Option<Shape>,
}

/// Read-only listing of a diagram's blocks and wires.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub name: Option<String>,
    pub blocks: Vec<BlockRow>,
    pub wires: Vec<WireRow>,
}

impl Report {
    pub fn new(diagram: &Diagram, plan: Option<&CompiledPlan>) -> Self {
        let positions = plan.map(CompiledPlan::positions);
        let blocks = diagram
            .blocks()
            .iter()
            .map(|node| BlockRow {
                id: node.id(),
                label: node.label(),
                class: node.class(),
                nin: node.nin(),
                nout: node.nout(),
                nstates: node.nstates(),
                order: positions
                    .as_ref()
                    .and_then(|p| p.get(node.id().slot()).copied()),
            })
            .collect();
        let wires = diagram
            .wires()
            .iter()
            .map(|w| WireRow {
                id: w.id(),
                label: w.to_string(),
                from: format!("{}[{}]", diagram.label(w.start().block), w.start().port),
                to: format!("{}[{}]", diagram.label(w.end().block), w.end().port),
                shape: w.shape(),
            })
            .collect();
        Self {
            name: diagram.name().map(str::to_string),
            blocks,
            wires,
        }
    }
}

impl Diagram {
    /// List all blocks and wires.
    pub fn report(&self) -> Report {
        Report::new(self, None)
    }
}

impl CompiledPlan {
    /// List all blocks and wires, annotated with execution order.
    pub fn report(&self, diagram: &Diagram) -> Report {
        Report::new(diagram, Some(self))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "Diagram: {name}")?;
        }
        let width = self
            .blocks
            .iter()
            .map(|b| b.label.len())
            .max()
            .unwrap_or(0)
            .max(5);

        writeln!(
            f,
            "{:>4}  {:<width$}  {:<8}  {:>3}  {:>4}  {:>7}  {:>5}",
            "id", "block", "class", "nin", "nout", "nstates", "order"
        )?;
        for b in &self.blocks {
            let order = b.order.map_or_else(|| "-".to_string(), |o| o.to_string());
            writeln!(
                f,
                "{:>4}  {:<width$}  {:<8}  {:>3}  {:>4}  {:>7}  {:>5}",
                b.id.to_string(),
                b.label,
                b.class.as_str(),
                b.nin,
                b.nout,
                b.nstates,
                order
            )?;
        }

        writeln!(f)?;
        for w in &self.wires {
            write!(f, "{}: {} --> {}", w.label, w.from, w.to)?;
            if let Some(shape) = w.shape {
                write!(f, "  ({shape})")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockInfo, SinkBlock, SourceBlock};
    use bf_core::{BlockResult, Value};

    struct Src;
    impl BlockInfo for Src {
        fn type_name(&self) -> &'static str {
            "src"
        }
    }
    impl SourceBlock for Src {
        fn output(&self, _t: f64) -> BlockResult<Vec<Value>> {
            Ok(vec![Value::scalar(1.0)])
        }
    }

    struct Null;
    impl BlockInfo for Null {
        fn type_name(&self) -> &'static str {
            "null"
        }
    }
    impl SinkBlock for Null {
        fn step(&mut self, _t: f64, _inputs: &[Value]) -> BlockResult<()> {
            Ok(())
        }
    }

    fn diagram() -> Diagram {
        let mut d = Diagram::named("demo");
        let s = d.add_block(Block::sink(Null));
        let a = d.add_named("u", Block::source(Src));
        d.connect(a, s).unwrap();
        d
    }

    #[test]
    fn uncompiled_report_has_no_order() {
        let d = diagram();
        let report = d.report();
        assert_eq!(report.name.as_deref(), Some("demo"));
        assert_eq!(report.blocks.len(), 2);
        assert!(report.blocks.iter().all(|b| b.order.is_none()));
        assert_eq!(report.wires[0].from, "src.u[0]");
        assert_eq!(report.wires[0].to, "null.block0[0]");
    }

    #[test]
    fn compiled_report_shows_positions() {
        let d = diagram();
        let plan = d.compile().unwrap();
        let report = plan.report(&d);
        assert_eq!(report.blocks[0].order, Some(1));
        assert_eq!(report.blocks[1].order, Some(0));

        let text = report.to_string();
        assert!(text.starts_with("Diagram: demo\n"));
        assert!(text.contains("wire.0: src.u[0] --> null.block0[0]"));
    }
}
