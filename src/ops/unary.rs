// unary.rs
// Element-wise unary functions.

use super::single;
use crate::error::{AutodiffError, Result};
use crate::graph::{Context, Differentiable, Kwargs, Pullback, Signature};
use crate::value::Value;

/// Element-wise negation: output = -x
#[derive(Debug, Clone, Copy, Default)]
pub struct Neg;

impl Differentiable for Neg {
    fn name(&self) -> &str {
        "neg"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(single(self.name(), args)?.map(|x| -x))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        Ok(pullback.cotangent.map(|g| -g))
    }
}

/// Element-wise exponential: output = exp(x)
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl Differentiable for Exp {
    fn name(&self) -> &str {
        "exp"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(single(self.name(), args)?.map(f64::exp))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        // d/dx(exp(x)) = exp(x), which is the cached output
        pullback
            .cotangent
            .zip_with(pullback.output, self.name(), |g, y| g * y)
    }
}

/// Element-wise natural logarithm: output = ln(x)
#[derive(Debug, Clone, Copy, Default)]
pub struct Ln;

impl Differentiable for Ln {
    fn name(&self) -> &str {
        "ln"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(single(self.name(), args)?.map(f64::ln))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        pullback
            .cotangent
            .zip_with(&pullback.args[0], self.name(), |g, x| g / x)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sin;

impl Differentiable for Sin {
    fn name(&self) -> &str {
        "sin"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(single(self.name(), args)?.map(f64::sin))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        pullback
            .cotangent
            .zip_with(&pullback.args[0], self.name(), |g, x| g * x.cos())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cos;

impl Differentiable for Cos {
    fn name(&self) -> &str {
        "cos"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(single(self.name(), args)?.map(f64::cos))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        pullback
            .cotangent
            .zip_with(&pullback.args[0], self.name(), |g, x| -g * x.sin())
    }
}

/// Hyperbolic tangent: output = tanh(x)
#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Differentiable for Tanh {
    fn name(&self) -> &str {
        "tanh"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], _kwargs: &Kwargs) -> Result<Value> {
        Ok(single(self.name(), args)?.map(f64::tanh))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        // d/dx(tanh(x)) = 1 - tanh²(x)
        pullback
            .cotangent
            .zip_with(pullback.output, self.name(), |g, y| g * (1.0 - y * y))
    }
}

/// Power with a keyword exponent: output = x^exponent
///
/// The derivative factor `exponent * x^(exponent - 1)` is computed once at forward
/// time and cached in the branch context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pow;

impl Pow {
    pub const EXPONENT: &'static str = "exponent";
}

impl Differentiable for Pow {
    fn name(&self) -> &str {
        "pow"
    }

    fn signature(&self) -> Signature {
        Signature::fixed(1)
    }

    fn forward(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        let p = kwargs.scalar(self.name(), Self::EXPONENT)?;
        Ok(single(self.name(), args)?.map(|x| x.powf(p)))
    }

    fn preprocess(&self, args: &[Value], kwargs: &Kwargs) -> Result<Context> {
        let p = kwargs.scalar(self.name(), Self::EXPONENT)?;
        // x^0 is constant; p * x^(p-1) would give 0 * inf at x = 0.
        let slope = single(self.name(), args)?.map(|x| {
            if p == 0.0 { 0.0 } else { p * x.powf(p - 1.0) }
        });
        Ok(Context::new(slope))
    }

    fn sensitivity(&self, _input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        let slope = pullback.context.get::<Value>().ok_or_else(|| {
            AutodiffError::invalid(self.name(), "branch context lost its cached slope")
        })?;
        pullback.cotangent.zip_with(slope, self.name(), |g, s| g * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_forward_values() {
        let kw = Kwargs::new();
        let x = [Value::scalar(0.5)];
        assert_abs_diff_eq!(Exp.forward(&x, &kw).unwrap().sum(), 0.5f64.exp());
        assert_abs_diff_eq!(Ln.forward(&x, &kw).unwrap().sum(), 0.5f64.ln());
        assert_abs_diff_eq!(Tanh.forward(&x, &kw).unwrap().sum(), 0.5f64.tanh());
        assert_eq!(Neg.forward(&x, &kw).unwrap(), Value::scalar(-0.5));
    }

    #[test]
    fn test_pow_caches_slope_in_context() {
        let kw = Kwargs::new().with(Pow::EXPONENT, 3.0);
        let x = [Value::scalar(2.0)];
        let ctx = Pow.preprocess(&x, &kw).unwrap();
        assert_eq!(ctx.get::<Value>(), Some(&Value::scalar(12.0)));
        assert_eq!(Pow.forward(&x, &kw).unwrap(), Value::scalar(8.0));
    }

    #[test]
    fn test_pow_zero_exponent_has_zero_slope() {
        let kw = Kwargs::new().with(Pow::EXPONENT, 0.0);
        let x = [Value::from_vec(vec![0.0, 2.0], &[2]).unwrap()];
        let ctx = Pow.preprocess(&x, &kw).unwrap();
        assert_eq!(ctx.get::<Value>(), Some(&Value::zeros(&[2])));
        assert_eq!(Pow.forward(&x, &kw).unwrap(), Value::ones(&[2]));
    }

    #[test]
    fn test_pow_requires_exponent() {
        let x = [Value::scalar(2.0)];
        assert!(Pow.forward(&x, &Kwargs::new()).is_err());
    }

    #[test]
    fn test_unary_arity_is_checked() {
        let args = [Value::scalar(1.0), Value::scalar(2.0)];
        assert!(Exp.forward(&args, &Kwargs::new()).is_err());
    }
}
