// basic.rs
// Binary arithmetic with scalar/array mixing.
// When a scalar met an array in the forward pass, its cotangent is summed back
// down to a scalar so it keeps the shape of the forward argument.

use super::pair;
use crate::error::Result;
use crate::graph::{Differentiable, Kwargs, Pullback, Signature};
use crate::value::Value;

/// Element-wise addition: output = a + b
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Differentiable for Add {
    fn name(&self) -> &str {
        "add"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(2)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (a, b) = pair(self.name(), args)?;
        a.zip_with(b, self.name(), |x, y| x + y)
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        // d/da(a + b) = 1, d/db(a + b) = 1
        pullback
            .cotangent
            .reduce_to(pullback.args[input].shape(), self.name())
    }
}

/// Element-wise subtraction: output = a - b
#[derive(Debug, Clone, Copy, Default)]
pub struct Sub;

impl Differentiable for Sub {
    fn name(&self) -> &str {
        "sub"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(2)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (a, b) = pair(self.name(), args)?;
        a.zip_with(b, self.name(), |x, y| x - y)
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        let grad = if input == 0 {
            pullback.cotangent.clone()
        } else {
            pullback.cotangent.map(|g| -g)
        };
        grad.reduce_to(pullback.args[input].shape(), self.name())
    }
}

/// Element-wise multiplication: output = a * b
#[derive(Debug, Clone, Copy, Default)]
pub struct Mul;

impl Differentiable for Mul {
    fn name(&self) -> &str {
        "mul"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(2)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (a, b) = pair(self.name(), args)?;
        a.zip_with(b, self.name(), |x, y| x * y)
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        // d/da(a * b) = b, d/db(a * b) = a
        let other = &pullback.args[1 - input];
        pullback
            .cotangent
            .zip_with(other, self.name(), |g, y| g * y)?
            .reduce_to(pullback.args[input].shape(), self.name())
    }
}

/// Element-wise division: output = a / b
#[derive(Debug, Clone, Copy, Default)]
pub struct Div;

impl Differentiable for Div {
    fn name(&self) -> &str {
        "div"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(2)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (a, b) = pair(self.name(), args)?;
        a.zip_with(b, self.name(), |x, y| x / y)
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        let b = &pullback.args[1];
        // d/da(a / b) = 1/b, d/db(a / b) = -(a/b)/b
        let grad = if input == 0 {
            pullback.cotangent.zip_with(b, self.name(), |g, y| g / y)?
        } else {
            let ratio = pullback.output.zip_with(b, self.name(), |o, y| -o / y)?;
            pullback.cotangent.zip_with(&ratio, self.name(), |g, r| g * r)?
        };
        grad.reduce_to(pullback.args[input].shape(), self.name())
    }
}

/// Scaling by a constant factor: output = factor * x
///
/// The factor position is declared non-differentiable; passing a tracked factor
/// is rejected at the call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scale;

impl Differentiable for Scale {
    fn name(&self) -> &str {
        "scale"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(2).with_mask(vec![false, true])
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (factor, x) = pair(self.name(), args)?;
        factor.zip_with(x, self.name(), |f, v| f * v)
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        pullback
            .cotangent
            .zip_with(&pullback.args[0], self.name(), |g, f| g * f)?
            .reduce_to(pullback.args[input].shape(), self.name())
    }
}
