use super::node::Node;
use super::op::{Context, Differentiable, Kwargs};
use crate::error::{AutodiffError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Atomic auto incrementing id for tapes.
static TAPE_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapeId(pub usize);

impl TapeId {
    fn next() -> Self {
        Self(TAPE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tape({})", self.0)
    }
}

/// Where one argument of a recorded call came from.
///
/// Tracked arguments keep their tape position instead of the `Node` handle, so a
/// branch never holds a reference back to its own tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Tracked(usize),
    Plain,
}

impl Source {
    pub fn position(&self) -> Option<usize> {
        match self {
            Source::Tracked(position) => Some(*position),
            Source::Plain => None,
        }
    }
}

/// A recorded operation invocation. Immutable once appended.
#[derive(Debug)]
pub struct Branch {
    operation: Rc<dyn Differentiable>,
    // Argument values exactly as passed, with their sources beside them.
    args: Vec<Value>,
    sources: Vec<Source>,
    kwargs: Kwargs,
    context: Context,
    output: Value,
    position: usize,
}

impl Branch {
    pub fn operation(&self) -> &Rc<dyn Differentiable> {
        &self.operation
    }

    pub fn name(&self) -> &str {
        self.operation.name()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    // Forward value cached at record time.
    pub fn output(&self) -> &Value {
        &self.output
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Tape entry: a leaf input or the branch that produced a node.
#[derive(Debug)]
pub enum Record {
    Leaf(Value),
    Branch(Branch),
}

impl Record {
    pub fn value(&self) -> &Value {
        match self {
            Record::Leaf(value) => value,
            Record::Branch(branch) => branch.output(),
        }
    }

    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            Record::Branch(branch) => Some(branch),
            Record::Leaf(_) => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Record::Leaf(_))
    }
}

struct TapeInner {
    id: TapeId,
    records: RefCell<Vec<Rc<Record>>>,
}

/// Append-only log shared by every node of one forward evaluation.
///
/// Cloning a `Tape` clones the handle, not the records. The handle is `!Send`:
/// one tape belongs to one single-threaded evaluation.
#[derive(Clone)]
pub struct Tape {
    inner: Rc<TapeInner>,
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

impl Tape {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(TapeInner {
                id: TapeId::next(),
                records: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> TapeId {
        self.inner.id
    }

    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn same_tape(&self, other: &Tape) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Records a user-supplied input and returns its tracked node.
    pub fn leaf(&self, value: impl Into<Value>) -> Node {
        let value = value.into();
        let position = self.push(Record::Leaf(value.clone()));
        Node::new(value, self.clone(), position)
    }

    /// Appends a branch and returns its position.
    ///
    /// `sources[i]` says where `args[i]` came from. Every tracked argument must already
    /// live on this tape at a smaller position.
    pub fn append(
        &self,
        operation: Rc<dyn Differentiable>,
        args: Vec<Value>,
        sources: Vec<Source>,
        kwargs: Kwargs,
        context: Context,
        output: Value,
    ) -> Result<usize> {
        if args.len() != sources.len() {
            return Err(AutodiffError::invalid(
                operation.name(),
                format!("{} arguments but {} sources", args.len(), sources.len()),
            ));
        }
        let position = self.len();
        if let Some(referenced) = sources
            .iter()
            .filter_map(Source::position)
            .find(|&p| p >= position)
        {
            return Err(AutodiffError::ForwardReference {
                position,
                referenced,
            });
        }

        let branch = Branch {
            operation,
            args,
            sources,
            kwargs,
            context,
            output,
            position,
        };
        Ok(self.push(Record::Branch(branch)))
    }

    fn push(&self, record: Record) -> usize {
        let mut records = self.inner.records.borrow_mut();
        records.push(Rc::new(record));
        records.len() - 1
    }

    pub fn get(&self, position: usize) -> Option<Rc<Record>> {
        self.inner.records.borrow().get(position).cloned()
    }

    // Snapshot of the records in append order.
    pub fn records(&self) -> Vec<Rc<Record>> {
        self.inner.records.borrow().clone()
    }
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tape")
            .field("id", &self.id().0)
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} with {} records", self.id(), self.len())?;
        for (position, record) in self.records().iter().enumerate() {
            match record.as_ref() {
                Record::Leaf(value) => writeln!(f, "  %{} = leaf {:?}", position, value.shape())?,
                Record::Branch(branch) => {
                    let args: Vec<String> = branch
                        .sources()
                        .iter()
                        .zip(branch.args())
                        .map(|(source, value)| match source {
                            Source::Tracked(position) => format!("%{}", position),
                            Source::Plain => format!("const{:?}", value.shape()),
                        })
                        .collect();
                    writeln!(
                        f,
                        "  %{} = {}({}) {:?}",
                        position,
                        branch.name(),
                        args.join(", "),
                        branch.output().shape()
                    )?;
                }
            }
        }
        Ok(())
    }
}
