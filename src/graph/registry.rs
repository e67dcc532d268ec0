use super::intercept::intercept;
use super::node::Arg;
use super::op::{Differentiable, Kwargs, Signature};
use crate::error::{AutodiffError, Result};
use crate::ops;
use std::collections::HashMap;
use std::rc::Rc;

/// Lookup table of differentiable operations keyed by operation id.
///
/// New operations plug in through [`Differentiable`] without touching the core.
/// Registration validates signatures up front, so malformed masks fail here
/// and never at call time.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    operations: HashMap<String, Rc<dyn Differentiable>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the operations in [`crate::ops`].
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        for operation in ops::builtins() {
            registry.register(operation)?;
        }
        Ok(registry)
    }

    pub fn register_operation(&mut self, operation: impl Differentiable + 'static) -> Result<()> {
        self.register(Rc::new(operation))
    }

    /// Registers a shared operation.
    ///
    /// Re-registering an id with an identical signature replaces the previous entry;
    /// a different arity or mask is a `ConflictingRegistration`.
    pub fn register(&mut self, operation: Rc<dyn Differentiable>) -> Result<()> {
        let name = operation.name().to_string();
        let signature = operation.signature();
        signature.validate(&name)?;

        if let Some(existing) = self.operations.get(&name) {
            if existing.signature() != signature {
                return Err(AutodiffError::ConflictingRegistration { operation: name });
            }
        }
        self.operations.insert(name, operation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn Differentiable>> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| AutodiffError::UnknownOperation(name.to_string()))
    }

    pub fn signature(&self, name: &str) -> Result<Signature> {
        Ok(self.get(name)?.signature())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // Call without keyword arguments.
    pub fn call<I, A>(&self, name: &str, args: I) -> Result<Arg>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.call_with(name, args, &Kwargs::new())
    }

    pub fn call_with<I, A>(&self, name: &str, args: I, kwargs: &Kwargs) -> Result<Arg>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let operation = self.get(name)?;
        intercept(&operation, args.into_iter().map(Into::into).collect(), kwargs)
    }
}
