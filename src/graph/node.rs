use super::tape::{Tape, TapeId};
use crate::value::Value;
use ndarray::ArrayD;
use std::fmt;

// Represents a tracked value in the computational graph.
// A node is either a leaf (user input) or the output of a recorded branch. In both
// cases it sits at `position` on its tape, which never points at a future record.
#[derive(Clone)]
pub struct Node {
    value: Value,
    tape: Tape,
    position: usize,
}

impl Node {
    pub(crate) fn new(value: Value, tape: Tape, position: usize) -> Self {
        Self {
            value,
            tape,
            position,
        }
    }

    // Convenience for a leaf on a fresh tape.
    pub fn leaf(value: impl Into<Value>) -> Self {
        Tape::new().leaf(value)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tape_id(&self) -> TapeId {
        self.tape.id()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_leaf(&self) -> bool {
        self.tape
            .get(self.position)
            .is_some_and(|record| record.is_leaf())
    }

    /// Drops tracking and returns the bare value as a call argument.
    pub fn detach(&self) -> Arg {
        Arg::Plain(self.value.clone())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node({}, %{}, {:?})",
            self.tape.id(),
            self.position,
            self.value
        )
    }
}

/// A call argument: tracked node or plain value.
#[derive(Debug, Clone)]
pub enum Arg {
    Tracked(Node),
    Plain(Value),
}

impl Arg {
    pub fn is_tracked(&self) -> bool {
        matches!(self, Arg::Tracked(_))
    }

    pub fn value(&self) -> &Value {
        match self {
            Arg::Tracked(node) => node.value(),
            Arg::Plain(value) => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Arg::Tracked(node) => node.into_value(),
            Arg::Plain(value) => value,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Arg::Tracked(node) => Some(node),
            Arg::Plain(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Arg::Tracked(node) => Some(node),
            Arg::Plain(_) => None,
        }
    }
}

impl From<Node> for Arg {
    fn from(node: Node) -> Self {
        Arg::Tracked(node)
    }
}

impl From<&Node> for Arg {
    fn from(node: &Node) -> Self {
        Arg::Tracked(node.clone())
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Plain(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Plain(Value::Scalar(value))
    }
}

impl From<ArrayD<f64>> for Arg {
    fn from(array: ArrayD<f64>) -> Self {
        Arg::Plain(Value::Array(array))
    }
}
