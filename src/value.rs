use crate::error::{AutodiffError, Result};
use ndarray::{Array, ArrayD, IxDyn, Zip};
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;

/// Numeric payload flowing through the tape: a plain scalar or a dynamic-rank array.
///
/// Forward values and cotangents share this type. Cotangents always carry the shape
/// of the forward value they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(ArrayD<f64>),
}

impl Value {
    pub fn scalar(value: f64) -> Self {
        Value::Scalar(value)
    }

    // Builds an array value from a flat vector in row-major order.
    pub fn from_vec(data: Vec<f64>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(AutodiffError::invalid(
                "from_vec",
                format!(
                    "data length {} doesn't match shape {:?} (expected {})",
                    data.len(),
                    shape,
                    expected
                ),
            ));
        }
        Ok(Value::Array(Array::from_shape_vec(IxDyn(shape), data)?))
    }

    pub fn zeros(shape: &[usize]) -> Self {
        if shape.is_empty() {
            Value::Scalar(0.0)
        } else {
            Value::Array(ArrayD::zeros(IxDyn(shape)))
        }
    }

    pub fn ones(shape: &[usize]) -> Self {
        if shape.is_empty() {
            Value::Scalar(1.0)
        } else {
            Value::Array(ArrayD::ones(IxDyn(shape)))
        }
    }

    /// Standard-normal samples with the given shape. An empty shape gives a scalar.
    pub fn randn(shape: &[usize]) -> Self {
        let mut rng = rand::rng();
        if shape.is_empty() {
            return Value::Scalar(rng.sample(StandardNormal));
        }
        Value::Array(ArrayD::from_shape_simple_fn(IxDyn(shape), || {
            rng.sample(StandardNormal)
        }))
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Value::Scalar(_) => &[],
            Value::Array(array) => array.shape(),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(x) => Some(*x),
            Value::Array(array) if array.ndim() == 0 => array.iter().next().copied(),
            Value::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Value::Array(array) => Some(array),
            Value::Scalar(_) => None,
        }
    }

    // Number of elements (1 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Array(array) => array.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Value::Scalar(x) => vec![*x],
            Value::Array(array) => array.iter().copied().collect(),
        }
    }

    /// Additive identity with the same shape. Gradient of a node nothing flowed into.
    pub fn zeros_like(&self) -> Self {
        match self {
            Value::Scalar(_) => Value::Scalar(0.0),
            Value::Array(array) => Value::Array(ArrayD::zeros(array.raw_dim())),
        }
    }

    /// Multiplicative identity with the same shape. Default seed of a reverse sweep.
    pub fn ones_like(&self) -> Self {
        match self {
            Value::Scalar(_) => Value::Scalar(1.0),
            Value::Array(array) => Value::Array(ArrayD::ones(array.raw_dim())),
        }
    }

    pub fn sum(&self) -> f64 {
        match self {
            Value::Scalar(x) => *x,
            Value::Array(array) => array.sum(),
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            Value::Scalar(x) => Value::Scalar(f(*x)),
            Value::Array(array) => Value::Array(array.mapv(f)),
        }
    }

    /// Elementwise binary combination used by forward functions.
    ///
    /// A scalar combines with every element of an array; two arrays must have the same
    /// shape. No other broadcasting is performed.
    pub fn zip_with(
        &self,
        other: &Value,
        operation: &str,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Self> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
            (Value::Scalar(a), Value::Array(b)) => Ok(Value::Array(b.mapv(|y| f(*a, y)))),
            (Value::Array(a), Value::Scalar(b)) => Ok(Value::Array(a.mapv(|x| f(x, *b)))),
            (Value::Array(a), Value::Array(b)) => {
                if a.shape() != b.shape() {
                    return Err(AutodiffError::IncompatibleShapes {
                        operation: operation.to_string(),
                        left: a.shape().to_vec(),
                        right: b.shape().to_vec(),
                    });
                }
                let mut out = a.clone();
                Zip::from(&mut out).and(b).for_each(|x, &y| *x = f(*x, y));
                Ok(Value::Array(out))
            }
        }
    }

    /// Cotangent accumulation. Shapes must agree exactly; nothing is broadcast.
    pub fn checked_add(&self, other: &Value, operation: &str, position: usize) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(AutodiffError::ShapeMismatch {
                operation: operation.to_string(),
                position,
                expected: self.shape().to_vec(),
                found: other.shape().to_vec(),
            });
        }
        self.zip_with(other, operation, |a, b| a + b)
    }

    /// Sums an elementwise cotangent down to the shape of a forward argument.
    ///
    /// Only the scalar-vs-array case of `zip_with` ever needs reducing.
    pub fn reduce_to(&self, shape: &[usize], operation: &str) -> Result<Self> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        if shape.is_empty() {
            return Ok(Value::Scalar(self.sum()));
        }
        Err(AutodiffError::IncompatibleShapes {
            operation: operation.to_string(),
            left: self.shape().to_vec(),
            right: shape.to_vec(),
        })
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(array: ArrayD<f64>) -> Self {
        Value::Array(array)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => write!(f, "{}", x),
            Value::Array(array) => write!(f, "{}", array),
        }
    }
}
