//! Plugs and wires.

use core::fmt;

use bf_core::{BlockId, Shape, Value, WireId};

/// Direction of a plug relative to its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlugDir {
    Input,
    Output,
}

impl fmt::Display for PlugDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlugDir::Input => f.write_str("input"),
            PlugDir::Output => f.write_str("output"),
        }
    }
}

/// Reference to one numbered port of a block, used when connecting.
///
/// A bare [`BlockId`] converts to port 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub block: BlockId,
    pub port: usize,
}

impl PortRef {
    pub fn new(block: BlockId, port: usize) -> Self {
        Self { block, port }
    }
}

impl From<BlockId> for PortRef {
    fn from(block: BlockId) -> Self {
        Self { block, port: 0 }
    }
}

impl From<(BlockId, usize)> for PortRef {
    fn from((block, port): (BlockId, usize)) -> Self {
        Self { block, port }
    }
}

/// One end of a wire: a (block, port) pair with a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Plug {
    pub block: BlockId,
    pub port: usize,
    pub dir: PlugDir,
}

/// Directed edge from an output port to an input port.
///
/// Caches the last value carried during a run and the shape fixed by the
/// first value, so later values can be checked for consistency.
#[derive(Debug, Clone)]
pub struct Wire {
    pub(crate) id: WireId,
    pub(crate) name: Option<String>,
    pub(crate) start: Plug,
    pub(crate) end: Plug,
    value: Option<Value>,
    shape: Option<Shape>,
}

impl Wire {
    pub(crate) fn new(id: WireId, from: PortRef, to: PortRef) -> Self {
        Self {
            id,
            name: None,
            start: Plug {
                block: from.block,
                port: from.port,
                dir: PlugDir::Output,
            },
            end: Plug {
                block: to.block,
                port: to.port,
                dir: PlugDir::Input,
            },
            value: None,
            shape: None,
        }
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Output-side plug.
    pub fn start(&self) -> Plug {
        self.start
    }

    /// Input-side plug.
    pub fn end(&self) -> Plug {
        self.end
    }

    /// Last value carried during the current run.
    ///
    /// Between steps this is the value delivered to the wire's destination
    /// at the most recent step, not an intermediate integrator stage.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Shape fixed by the first value carried during the current run.
    pub fn shape(&self) -> Option<Shape> {
        self.shape
    }

    /// Store a new value, enforcing the wire's shape.
    ///
    /// On mismatch returns `(expected, found)` and leaves the cache untouched.
    pub fn carry(&mut self, value: Value) -> Result<(), (Shape, Shape)> {
        let found = value.shape();
        match self.shape {
            Some(expected) if expected != found => return Err((expected, found)),
            Some(_) => {}
            None => self.shape = Some(found),
        }
        self.value = Some(value);
        Ok(())
    }

    /// Put back a value previously read with [`Wire::value`].
    ///
    /// The shape is left as is; used by the executor to undo the
    /// intermediate values written by integrator stages.
    pub fn restore(&mut self, value: Option<Value>) {
        self.value = value;
    }

    /// Forget the cached value and shape. Called at the start of each run.
    pub fn clear(&mut self) {
        self.value = None;
        self.shape = None;
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "wire.{name}"),
            None => write!(f, "wire.{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire() -> Wire {
        Wire::new(
            WireId::from_index(0),
            PortRef::from(BlockId::from_index(0)),
            PortRef::new(BlockId::from_index(1), 1),
        )
    }

    #[test]
    fn bare_block_is_port_zero() {
        let p: PortRef = BlockId::from_index(4).into();
        assert_eq!(p.port, 0);
    }

    #[test]
    fn plugs_carry_direction() {
        let w = wire();
        assert_eq!(w.start().dir, PlugDir::Output);
        assert_eq!(w.end().dir, PlugDir::Input);
        assert_eq!(w.end().port, 1);
        assert_eq!(w.to_string(), "wire.0");
    }

    #[test]
    fn first_value_fixes_shape() {
        let mut w = wire();
        w.carry(Value::scalar(1.0)).unwrap();
        assert_eq!(w.shape(), Some(Shape::Scalar));

        let err = w.carry(Value::vector(vec![1.0, 2.0])).unwrap_err();
        assert_eq!(err, (Shape::Scalar, Shape::Vector(2)));
        assert_eq!(w.value(), Some(&Value::scalar(1.0)));

        let held = w.value().cloned();
        w.carry(Value::scalar(5.0)).unwrap();
        w.restore(held);
        assert_eq!(w.value(), Some(&Value::scalar(1.0)));

        w.clear();
        assert!(w.value().is_none());
        w.carry(Value::vector(vec![1.0, 2.0])).unwrap();
        assert_eq!(w.shape(), Some(Shape::Vector(2)));
    }
}
