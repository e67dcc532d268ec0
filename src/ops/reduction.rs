// reduction.rs
// Reductions, including the variadic ones whose arguments arrive as a tail.

use super::{pair, single};
use crate::error::{AutodiffError, Result};
use crate::graph::{Context, Differentiable, Kwargs, Pullback, Signature};
use crate::value::Value;

/// Variadic sum: output = x1 + x2 + ... + xn
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl Differentiable for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn signature(&self) -> Signature {
        Signature::variadic(0)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (first, rest) = args
            .split_first()
            .ok_or_else(|| AutodiffError::invalid(self.name(), "needs at least one value"))?;
        rest.iter()
            .try_fold(first.clone(), |acc, x| acc.zip_with(x, self.name(), |a, b| a + b))
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        pullback
            .cotangent
            .reduce_to(pullback.args[input].shape(), self.name())
    }
}

/// Variadic maximum over scalars.
///
/// The winning index is found once at forward time and kept in the branch context;
/// the cotangent flows to that argument only. Ties go to the first maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl Max {
    fn argmax(&self, args: &[Value]) -> Result<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, arg) in args.iter().enumerate() {
            let x = arg.as_scalar().ok_or_else(|| {
                AutodiffError::invalid(self.name(), format!("argument {} is not a scalar", index))
            })?;
            if best.is_none_or(|(_, b)| x > b) {
                best = Some((index, x));
            }
        }
        best.ok_or_else(|| AutodiffError::invalid(self.name(), "needs at least one value"))
    }
}

impl Differentiable for Max {
    fn name(&self) -> &str {
        "max"
    }

    fn signature(&self) -> Signature {
        Signature::variadic(0)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(Value::scalar(self.argmax(args)?.1))
    }

    fn preprocess(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Context> {
        Ok(Context::new(self.argmax(args)?.0))
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        let winner = pullback.context.get::<usize>().copied().ok_or_else(|| {
            AutodiffError::invalid(self.name(), "branch context lost its argmax")
        })?;
        let arg = &pullback.args[input];
        if input == winner {
            pullback.cotangent.reduce_to(arg.shape(), self.name())
        } else {
            Ok(arg.zeros_like())
        }
    }
}

/// Inner product of two equally shaped values: output = sum(a * b)
#[derive(Debug, Clone, Copy, Default)]
pub struct Dot;

impl Differentiable for Dot {
    fn name(&self) -> &str {
        "dot"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(2)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        let (a, b) = pair(self.name(), args)?;
        if a.shape() != b.shape() {
            return Err(AutodiffError::IncompatibleShapes {
                operation: self.name().to_string(),
                left: a.shape().to_vec(),
                right: b.shape().to_vec(),
            });
        }
        Ok(Value::scalar(a.zip_with(b, self.name(), |x, y| x * y)?.sum()))
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        let g = pullback.cotangent.sum();
        Ok(pullback.args[1 - input].map(|y| g * y))
    }
}

/// Sum of every element: output = sum(x)
#[derive(Debug, Clone, Copy, Default)]
pub struct SumAll;

impl Differentiable for SumAll {
    fn name(&self) -> &str {
        "sum_all"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(Value::scalar(single(self.name(), args)?.sum()))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        let g = pullback.cotangent.sum();
        Ok(pullback.args[0].map(|_| g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_is_variadic() {
        let kw = Kwargs::new();
        let args = [Value::scalar(1.0), Value::scalar(2.0), Value::scalar(4.0)];
        assert_eq!(Sum.forward(&args, &kw).unwrap(), Value::scalar(7.0));
        assert!(Sum.forward(&[], &kw).is_err());
    }

    #[test]
    fn test_max_prefers_first_tie() {
        let kw = Kwargs::new();
        let args = [Value::scalar(3.0), Value::scalar(5.0), Value::scalar(5.0)];
        assert_eq!(Max.forward(&args, &kw).unwrap(), Value::scalar(5.0));
        let ctx = Max.preprocess(&args, &kw).unwrap();
        assert_eq!(ctx.get::<usize>(), Some(&1));
    }

    #[test]
    fn test_max_rejects_arrays() {
        let a = Value::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        assert!(Max.forward(&[a], &Kwargs::new()).is_err());
    }

    #[test]
    fn test_dot_requires_equal_shapes() {
        let a = Value::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let b = Value::from_vec(vec![4.0, 5.0, 6.0], &[3]).unwrap();
        assert_eq!(
            Dot.forward(&[a.clone(), b], &Kwargs::new()).unwrap(),
            Value::scalar(32.0)
        );
        assert!(Dot.forward(&[a, Value::scalar(1.0)], &Kwargs::new()).is_err());
    }
}
