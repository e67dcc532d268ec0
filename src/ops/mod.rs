// Built-in differentiable operations.
// Each one implements `Differentiable` and can be registered like any user operation.
use crate::error::{AutodiffError, Result};
use crate::graph::Differentiable;
use crate::value::Value;
use std::rc::Rc;

pub mod basic;
pub mod custom;
pub mod reduction;
pub mod unary;

pub use basic::*;
pub use custom::CustomOp;
pub use reduction::*;
pub use unary::*;

/// Every built-in operation, ready for registration.
pub fn builtins() -> Vec<Rc<dyn Differentiable>> {
    vec![
        Rc::new(Add),
        Rc::new(Sub),
        Rc::new(Mul),
        Rc::new(Div),
        Rc::new(Scale),
        Rc::new(Neg),
        Rc::new(Exp),
        Rc::new(Ln),
        Rc::new(Sin),
        Rc::new(Cos),
        Rc::new(Tanh),
        Rc::new(Pow),
        Rc::new(Sum),
        Rc::new(Max),
        Rc::new(Dot),
        Rc::new(SumAll),
    ]
}

pub(crate) fn single<'a>(operation: &str, args: &'a [Value]) -> Result<&'a Value> {
    match args {
        [x] => Ok(x),
        _ => Err(AutodiffError::ArityMismatch {
            operation: operation.to_string(),
            expected: "1".to_string(),
            found: args.len(),
        }),
    }
}

pub(crate) fn pair<'a>(operation: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value)> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(AutodiffError::ArityMismatch {
            operation: operation.to_string(),
            expected: "2".to_string(),
            found: args.len(),
        }),
    }
}
