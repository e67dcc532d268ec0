use super::node::{Arg, Node};
use super::op::Pullback;
use super::tape::{Branch, Record, Tape, TapeId};
use crate::error::{AutodiffError, Result};
use crate::value::Value;
use std::collections::HashMap;

/// Options for a reverse sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// Output cotangent. Defaults to ones shaped like the output.
    pub seed: Option<Value>,
    /// Also return cotangents of every node reached, not only the requested ones.
    pub retain_all: bool,
}

impl SweepOptions {
    pub fn with_seed(seed: impl Into<Value>) -> Self {
        Self {
            seed: Some(seed.into()),
            ..Self::default()
        }
    }
}

/// Result of a sweep: one cotangent per requested node, keyed by tape position.
#[derive(Debug, Clone)]
pub struct Gradients {
    tape: TapeId,
    requested: Vec<usize>,
    by_position: HashMap<usize, Value>,
}

impl Gradients {
    pub fn get(&self, node: &Node) -> Option<&Value> {
        if node.tape_id() != self.tape {
            return None;
        }
        self.by_position.get(&node.position())
    }

    pub fn at(&self, position: usize) -> Option<&Value> {
        self.by_position.get(&position)
    }

    pub fn tape_id(&self) -> TapeId {
        self.tape
    }

    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    // Requested cotangents in request order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Value)> + '_ {
        self.requested
            .iter()
            .filter_map(|&p| self.by_position.get(&p).map(|g| (p, g)))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.requested
            .iter()
            .filter_map(|p| self.by_position.get(p).cloned())
            .collect()
    }
}

/// Gradient of `output` with respect to each node in `wrt`, seeded with ones.
pub fn gradient(output: &Node, wrt: &[&Node]) -> Result<Gradients> {
    gradient_with(output, wrt, &SweepOptions::default())
}

pub fn gradient_with_seed(output: &Node, wrt: &[&Node], seed: Value) -> Result<Gradients> {
    gradient_with(output, wrt, &SweepOptions::with_seed(seed))
}

pub fn gradient_with(output: &Node, wrt: &[&Node], options: &SweepOptions) -> Result<Gradients> {
    if let Some(stranger) = wrt.iter().find(|n| !n.tape().same_tape(output.tape())) {
        return Err(AutodiffError::GraphMismatch {
            operation: "gradient".to_string(),
            expected: output.tape_id().0,
            found: stranger.tape_id().0,
        });
    }

    let seed = match &options.seed {
        Some(seed) => seed.clone(),
        None => output.value().ones_like(),
    };
    let accumulator = reverse_sweep(output.tape(), output.position(), seed)?;

    // Nodes nothing flowed into, including nodes recorded after the output, get zeros.
    let mut by_position = HashMap::new();
    for node in wrt {
        let cotangent = accumulator
            .get(node.position())
            .and_then(|cotangent| cotangent.clone())
            .unwrap_or_else(|| node.value().zeros_like());
        by_position.insert(node.position(), cotangent);
    }
    if options.retain_all {
        for (position, cotangent) in accumulator.into_iter().enumerate() {
            if let Some(cotangent) = cotangent {
                by_position.entry(position).or_insert(cotangent);
            }
        }
    }

    Ok(Gradients {
        tape: output.tape_id(),
        requested: wrt.iter().map(|n| n.position()).collect(),
        by_position,
    })
}

/// Walks `tape` from `position` down to 0 and returns the accumulated cotangent
/// of every position reached.
///
/// Branch arguments always sit at smaller positions, so by the time a position is
/// visited every consumer of it has already contributed.
pub fn reverse_sweep(tape: &Tape, position: usize, seed: Value) -> Result<Vec<Option<Value>>> {
    let record = tape.get(position).ok_or_else(|| {
        AutodiffError::invalid("gradient", format!("position {} is not on {}", position, tape.id()))
    })?;
    if seed.shape() != record.value().shape() {
        return Err(AutodiffError::ShapeMismatch {
            operation: "seed".to_string(),
            position,
            expected: record.value().shape().to_vec(),
            found: seed.shape().to_vec(),
        });
    }

    let mut accumulator: Vec<Option<Value>> = vec![None; position + 1];
    accumulator[position] = Some(seed);

    for current in (0..=position).rev() {
        let cotangent = match accumulator[current].take() {
            Some(cotangent) => cotangent,
            None => continue,
        };
        let record = tape.get(current).ok_or_else(|| {
            AutodiffError::invalid("gradient", format!("missing record at position {}", current))
        })?;

        // Leaves stop here: their cotangent is final.
        if let Record::Branch(branch) = record.as_ref() {
            propagate(branch, &cotangent, &mut accumulator)?;
        }
        accumulator[current] = Some(cotangent);
    }

    Ok(accumulator)
}

fn propagate(branch: &Branch, cotangent: &Value, accumulator: &mut [Option<Value>]) -> Result<()> {
    let pullback = Pullback {
        args: branch.args(),
        output: branch.output(),
        cotangent,
        context: branch.context(),
        kwargs: branch.kwargs(),
        position: branch.position(),
    };

    for (index, (source, arg)) in branch.sources().iter().zip(branch.args()).enumerate() {
        let input = match source.position() {
            Some(input) => input,
            None => continue,
        };
        let contribution = branch.operation().sensitivity(index, &pullback)?;
        if contribution.shape() != arg.shape() {
            return Err(AutodiffError::ShapeMismatch {
                operation: branch.name().to_string(),
                position: branch.position(),
                expected: arg.shape().to_vec(),
                found: contribution.shape().to_vec(),
            });
        }

        let slot = accumulator
            .get_mut(input)
            .ok_or(AutodiffError::ForwardReference {
                position: branch.position(),
                referenced: input,
            })?;
        // Fan-in: contributions from every consumer are summed.
        *slot = Some(match slot.take() {
            Some(existing) => existing.checked_add(&contribution, branch.name(), branch.position())?,
            None => contribution,
        });
    }
    Ok(())
}

/// Differentiates `f` at `inputs` on a fresh tape.
///
/// Returns the output value and one gradient per input. An output that does not
/// depend on any input yields zero gradients.
pub fn grad<F>(f: F, inputs: &[Value]) -> Result<(Value, Vec<Value>)>
where
    F: FnOnce(&[Node]) -> Result<Arg>,
{
    let tape = Tape::new();
    let leaves: Vec<Node> = inputs.iter().map(|v| tape.leaf(v.clone())).collect();

    match f(&leaves)? {
        Arg::Tracked(output) => {
            let wrt: Vec<&Node> = leaves.iter().collect();
            let gradients = gradient(&output, &wrt)?;
            Ok((output.into_value(), gradients.into_values()))
        }
        Arg::Plain(value) => Ok((value, inputs.iter().map(Value::zeros_like).collect())),
    }
}
