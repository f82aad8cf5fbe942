//! Signal values carried on wires.

use core::fmt;

use crate::error::{BlockError, BlockResult};

/// Shape of a signal value, used for wire consistency checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    Scalar,
    Vector(usize),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "scalar"),
            Shape::Vector(n) => write!(f, "vector({n})"),
        }
    }
}

/// Value propagated along a wire during one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Value {
    pub fn scalar(value: f64) -> Self {
        Self::Scalar(value)
    }

    pub fn vector(values: impl Into<Vec<f64>>) -> Self {
        Self::Vector(values.into())
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Scalar,
            Self::Vector(v) => Shape::Vector(v.len()),
        }
    }

    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scalar value, or a shape error for vectors.
    pub fn as_scalar(&self) -> BlockResult<f64> {
        match self {
            Self::Scalar(v) => Ok(*v),
            Self::Vector(v) if v.len() == 1 => Ok(v[0]),
            Self::Vector(_) => Err(BlockError::ShapeMismatch {
                what: "scalar input",
                expected: Shape::Scalar,
                found: self.shape(),
            }),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => core::slice::from_ref(v),
            Self::Vector(v) => v,
        }
    }

    /// Apply `f` element-wise, preserving shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Self::Scalar(v) => Self::Scalar(f(*v)),
            Self::Vector(v) => Self::Vector(v.iter().map(|x| f(*x)).collect()),
        }
    }

    /// Combine two values of equal shape element-wise.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> BlockResult<Self> {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Ok(Self::Scalar(f(*a, *b))),
            (Self::Vector(a), Self::Vector(b)) if a.len() == b.len() => Ok(Self::Vector(
                a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect(),
            )),
            _ => Err(BlockError::ShapeMismatch {
                what: "element-wise operand",
                expected: self.shape(),
                found: other.shape(),
            }),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.as_slice().iter().all(|v| v.is_finite())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Vector(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}
