// intercept.rs
// Runtime dispatch for a registered operation: look at which arguments are actually
// tracked and either call the plain implementation or record a branch.
// One function covers every tracked/untracked combination, so nothing has to be
// generated per combination of argument kinds.
//! Operations reach a tape only through [`crate::Registry`], which validates their
//! signatures first; the dispatch itself is not callable from outside the crate.
//!
//! ```compile_fail
//! use tapegrad::graph::intercept::intercept;
//! ```
use super::node::{Arg, Node};
use super::op::{Differentiable, Kwargs, Signature};
use super::tape::{Source, Tape};
use crate::error::{AutodiffError, Result};
use crate::value::Value;
use std::rc::Rc;

/// Tracked status per logical position. The variadic tail is one position: it is
/// tracked when any of its elements is.
pub fn tracked_slots(signature: &Signature, args: &[Arg]) -> Vec<bool> {
    let mut slots = vec![false; signature.arity.slots()];
    for (index, arg) in args.iter().enumerate() {
        if arg.is_tracked() {
            if let Some(slot) = slots.get_mut(signature.slot_of(index)) {
                *slot = true;
            }
        }
    }
    slots
}

/// Tape of the first tracked argument (fixed positions left to right, then the tail).
/// Every other tracked argument must live on the same tape.
pub fn shared_tape(operation: &str, args: &[Arg]) -> Result<Tape> {
    let mut nodes = args.iter().filter_map(Arg::as_node);
    let first = nodes
        .next()
        .ok_or_else(|| AutodiffError::invalid(operation, "no tracked argument"))?;

    if let Some(other) = nodes.find(|node| !node.tape().same_tape(first.tape())) {
        return Err(AutodiffError::GraphMismatch {
            operation: operation.to_string(),
            expected: first.tape_id().0,
            found: other.tape_id().0,
        });
    }
    Ok(first.tape().clone())
}

/// Calls `operation` on a mix of tracked and plain arguments.
///
/// With no tracked argument this is exactly the plain forward call and touches no tape.
/// Otherwise the branch is appended to the shared tape and a new node is returned.
pub(crate) fn intercept(
    operation: &Rc<dyn Differentiable>,
    args: Vec<Arg>,
    kwargs: &Kwargs,
) -> Result<Arg> {
    let signature = operation.signature();
    let name = operation.name();

    if !signature.arity.accepts(args.len()) {
        return Err(AutodiffError::ArityMismatch {
            operation: name.to_string(),
            expected: signature.arity.to_string(),
            found: args.len(),
        });
    }

    if !tracked_slots(&signature, &args).contains(&true) {
        let values: Vec<Value> = args.into_iter().map(Arg::into_value).collect();
        return operation.forward(&values, kwargs).map(Arg::Plain);
    }

    if let Some(argument) = args
        .iter()
        .enumerate()
        .position(|(index, arg)| arg.is_tracked() && !signature.is_differentiable(index))
    {
        return Err(AutodiffError::NotDifferentiable {
            operation: name.to_string(),
            argument,
        });
    }

    let tape = shared_tape(name, &args)?;
    let sources: Vec<Source> = args
        .iter()
        .map(|arg| match arg.as_node() {
            Some(node) => Source::Tracked(node.position()),
            None => Source::Plain,
        })
        .collect();
    let values: Vec<Value> = args.into_iter().map(Arg::into_value).collect();

    let context = operation.preprocess(&values, kwargs)?;
    let output = operation.forward(&values, kwargs)?;

    let position = tape.append(
        Rc::clone(operation),
        values,
        sources,
        kwargs.clone(),
        context,
        output.clone(),
    )?;

    Ok(Arg::Tracked(Node::new(output, tape, position)))
}
