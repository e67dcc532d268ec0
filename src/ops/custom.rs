// custom.rs
// Operations assembled from closures, for callers that register their own
// functions without writing a type per operation.

use crate::error::{AutodiffError, Result};
use crate::graph::{Arity, Context, Differentiable, Kwargs, Pullback, Signature};
use crate::value::Value;
use std::fmt;

type ForwardFn = Box<dyn Fn(&[Value], &Kwargs) -> Result<Value>>;
type PreprocessFn = Box<dyn Fn(&[Value], &Kwargs) -> Result<Context>>;
type SensitivityFn = Box<dyn Fn(usize, &Pullback<'_>) -> Result<Value>>;

/// Closure-backed operation: id, arity, mask, forward function, optional sensitivity
/// provider and optional preprocessing hook.
///
/// Without a sensitivity provider the operation still records branches; the reverse
/// sweep fails with `MissingSensitivity` the first time it reaches one.
pub struct CustomOp {
    name: String,
    signature: Signature,
    forward: ForwardFn,
    preprocess: Option<PreprocessFn>,
    sensitivity: Option<SensitivityFn>,
}

impl CustomOp {
    pub fn new(
        name: impl Into<String>,
        arity: Arity,
        forward: impl Fn(&[Value], &Kwargs) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature: Signature {
                arity,
                mask: vec![true; arity.slots()],
            },
            forward: Box::new(forward),
            preprocess: None,
            sensitivity: None,
        }
    }

    pub fn mask(mut self, mask: impl Into<Vec<bool>>) -> Self {
        self.signature.mask = mask.into();
        self
    }

    pub fn with_sensitivity(
        mut self,
        provider: impl Fn(usize, &Pullback<'_>) -> Result<Value> + 'static,
    ) -> Self {
        self.sensitivity = Some(Box::new(provider));
        self
    }

    pub fn with_preprocess(
        mut self,
        hook: impl Fn(&[Value], &Kwargs) -> Result<Context> + 'static,
    ) -> Self {
        self.preprocess = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for CustomOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOp")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("preprocess", &self.preprocess.is_some())
            .field("sensitivity", &self.sensitivity.is_some())
            .finish()
    }
}

impl Differentiable for CustomOp {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn forward(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
        (self.forward)(args, kwargs)
    }

    fn preprocess(&self, args: &[Value], kwargs: &Kwargs) -> Result<Context> {
        match &self.preprocess {
            Some(hook) => hook(args, kwargs),
            None => Ok(Context::empty()),
        }
    }

    fn sensitivity(&self, input: usize, pullback: &Pullback<'_>) -> Result<Value> {
        match &self.sensitivity {
            Some(provider) => provider(input, pullback),
            None => Err(AutodiffError::MissingSensitivity {
                operation: self.name.clone(),
                position: pullback.position,
            }),
        }
    }
}
