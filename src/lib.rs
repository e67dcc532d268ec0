//! # Tapegrad
//!
//! Tapegrad is a small reverse-mode automatic differentiation engine. Numeric code runs
//! once, eagerly, while every call that touches a tracked value is logged on a tape;
//! the tape is then replayed backwards to get exact gradients.
//!
//! ## Features
//!
//! - Runtime interception: one dispatch per registered operation decides, from the
//!   arguments actually passed, whether to record a branch or just compute
//! - Variadic operations and partially tracked argument lists
//! - Keyword arguments forwarded untouched
//! - Single-pass reverse sweep in tape order with fan-in accumulation
//! - Pluggable operations through the `Differentiable` trait
//! - Scalar and array values via `ndarray`
//! - Tape visualization (GraphViz DOT)
//!
//! ```
//! use tapegrad::{Registry, Tape, gradient};
//!
//! let registry = Registry::with_builtins().unwrap();
//! let tape = Tape::new();
//! let x = tape.leaf(2.0);
//! let y = tape.leaf(3.0);
//!
//! let z = registry.call("mul", [&x, &y]).unwrap().into_node().unwrap();
//! let grads = gradient(&z, &[&x, &y]).unwrap();
//!
//! assert_eq!(grads.get(&x).unwrap().as_scalar(), Some(3.0));
//! assert_eq!(grads.get(&y).unwrap().as_scalar(), Some(2.0));
//! ```
pub mod error;
pub mod graph;
pub mod ops;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{AutodiffError, Result};
pub use graph::{
    Arg, Arity, Context, Differentiable, Gradients, Kwargs, Node, Pullback, Registry, Signature,
    SweepOptions, Tape, grad, gradient, gradient_with, gradient_with_seed,
};
pub use ops::CustomOp;
pub use value::Value;
