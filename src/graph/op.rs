// op.rs
// Every operation the engine can record implements the `Differentiable` trait.
// The core never knows concrete formulas: it only calls forward, preprocess and
// sensitivity through this interface.
use crate::error::{AutodiffError, Result};
use crate::value::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

/// Positional shape of an operation's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// `fixed` leading parameters followed by a variadic tail of any length.
    Variadic { fixed: usize },
}

impl Arity {
    /// Number of logical positions: each fixed parameter plus one for the tail.
    pub fn slots(&self) -> usize {
        match *self {
            Arity::Fixed(n) => n,
            Arity::Variadic { fixed } => fixed + 1,
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, Arity::Variadic { .. })
    }

    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Fixed(n) => count == n,
            Arity::Variadic { fixed } => count >= fixed,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic { fixed } => write!(f, "at least {}", fixed),
        }
    }
}

/// Arity plus the differentiability mask: which logical positions may ever be tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub arity: Arity,
    pub mask: Vec<bool>,
}

impl Signature {
    // All positions differentiable.
    pub fn fixed(n: usize) -> Self {
        Self {
            arity: Arity::Fixed(n),
            mask: vec![true; n],
        }
    }

    pub fn variadic(fixed: usize) -> Self {
        Self {
            arity: Arity::Variadic { fixed },
            mask: vec![true; fixed + 1],
        }
    }

    pub fn with_mask(mut self, mask: impl Into<Vec<bool>>) -> Self {
        self.mask = mask.into();
        self
    }

    /// Maps a flat argument index to its logical position; tail elements share the last one.
    pub fn slot_of(&self, argument: usize) -> usize {
        match self.arity {
            Arity::Fixed(_) => argument,
            Arity::Variadic { fixed } => argument.min(fixed),
        }
    }

    pub fn is_differentiable(&self, argument: usize) -> bool {
        self.mask
            .get(self.slot_of(argument))
            .copied()
            .unwrap_or(false)
    }

    pub(crate) fn validate(&self, operation: &str) -> Result<()> {
        if self.mask.len() != self.arity.slots() {
            return Err(AutodiffError::Configuration {
                operation: operation.to_string(),
                reason: format!(
                    "mask has {} entries but arity {:?} has {} positions",
                    self.mask.len(),
                    self.arity,
                    self.arity.slots()
                ),
            });
        }
        if !self.mask.iter().any(|&d| d) {
            return Err(AutodiffError::Configuration {
                operation: operation.to_string(),
                reason: "no position is differentiable".to_string(),
            });
        }
        Ok(())
    }
}

/// Opaque payload computed at forward time and read back during the reverse sweep.
#[derive(Default)]
pub struct Context(Option<Box<dyn Any>>);

impl Context {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new<T: Any>(payload: T) -> Self {
        Self(Some(Box::new(payload)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "Context(..)"),
            None => write!(f, "Context(empty)"),
        }
    }
}

/// Keyword arguments. They never take part in tracking and are forwarded unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs(BTreeMap<String, Value>);

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn scalar(&self, operation: &str, name: &str) -> Result<f64> {
        self.get(name)
            .and_then(Value::as_scalar)
            .ok_or_else(|| {
                AutodiffError::invalid(operation, format!("missing scalar keyword `{}`", name))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Everything a sensitivity provider sees for one recorded branch.
#[derive(Debug, Clone, Copy)]
pub struct Pullback<'a> {
    /// Unwrapped forward arguments, variadic tail flattened at the end.
    pub args: &'a [Value],
    pub output: &'a Value,
    /// Accumulated cotangent of the branch output.
    pub cotangent: &'a Value,
    pub context: &'a Context,
    pub kwargs: &'a Kwargs,
    /// Tape position of the branch being pulled back.
    pub position: usize,
}

/// Capability interface of a recordable operation.
pub trait Differentiable: fmt::Debug {
    /// Operation identifier, also the registry key.
    fn name(&self) -> &str;

    fn signature(&self) -> Signature;

    /// The plain, untracked implementation.
    fn forward(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value>;

    /// Forward-time hook whose result is cached on the branch.
    fn preprocess(&self, _args: &[Value], _kwargs: &Kwargs) -> Result<Context> {
        Ok(Context::empty())
    }

    /// Cotangent contribution for flat argument `input`, shaped like `args[input]`.
    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_mapping_for_variadic_tail() {
        let sig = Signature::variadic(1).with_mask(vec![false, true]);
        assert_eq!(sig.slot_of(0), 0);
        assert_eq!(sig.slot_of(1), 1);
        assert_eq!(sig.slot_of(5), 1);
        assert!(!sig.is_differentiable(0));
        assert!(sig.is_differentiable(4));
        assert!(sig.arity.accepts(1));
        assert!(!sig.arity.accepts(0));
    }

    #[test]
    fn test_validate_rejects_malformed_masks() {
        assert!(Signature::fixed(2).validate("ok").is_ok());
        assert!(Signature::fixed(2).with_mask(vec![true]).validate("short").is_err());
        assert!(Signature::variadic(0).with_mask(vec![true, true]).validate("long").is_err());
        assert!(Signature::fixed(1).with_mask(vec![false]).validate("none").is_err());
    }

    #[test]
    fn test_context_downcast() {
        let ctx = Context::new(3usize);
        assert_eq!(ctx.get::<usize>(), Some(&3));
        assert!(ctx.get::<f64>().is_none());
        assert!(Context::empty().is_empty());
    }

    #[test]
    fn test_kwargs_scalar_lookup() {
        let kw = Kwargs::new().with("exponent", 2.0);
        assert_eq!(kw.scalar("pow", "exponent").unwrap(), 2.0);
        assert!(kw.scalar("pow", "base").is_err());
    }
}
