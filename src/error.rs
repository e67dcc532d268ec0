//! Error types for the tape engine.

use thiserror::Error;

/// Errors surfaced by registration, interception and the reverse sweep.
///
/// Nothing in the engine recovers from these internally: every variant aborts the
/// current evaluation and carries enough context (operation, tape position) to find
/// the failing call.
#[derive(Debug, Error)]
pub enum AutodiffError {
    /// Malformed signature or differentiability mask, reported at registration.
    #[error("invalid registration for `{operation}`: {reason}")]
    Configuration { operation: String, reason: String },

    /// The same operation id was registered twice with different signatures.
    #[error("operation `{operation}` is already registered with a conflicting signature")]
    ConflictingRegistration { operation: String },

    #[error("no operation named `{0}` is registered")]
    UnknownOperation(String),

    #[error("`{operation}` expects {expected} arguments, got {found}")]
    ArityMismatch {
        operation: String,
        expected: String,
        found: usize,
    },

    /// A tracked value was passed at a position the operation never differentiates.
    #[error("argument {argument} of `{operation}` cannot be tracked")]
    NotDifferentiable { operation: String, argument: usize },

    /// Tracked values from two different tapes met in one call or query.
    #[error("mismatched computation graph in `{operation}`: tape {expected} vs tape {found}")]
    GraphMismatch {
        operation: String,
        expected: usize,
        found: usize,
    },

    #[error("branch at position {position} references future position {referenced}")]
    ForwardReference { position: usize, referenced: usize },

    /// Cotangent shape disagrees with the forward value it belongs to.
    #[error("shape mismatch in `{operation}` at position {position}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        operation: String,
        position: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// Forward-time numeric failure on incompatible operand shapes.
    #[error("incompatible shapes in `{operation}`: {left:?} and {right:?}")]
    IncompatibleShapes {
        operation: String,
        left: Vec<usize>,
        right: Vec<usize>,
    },

    #[error("no sensitivity bound for `{operation}` (branch at position {position})")]
    MissingSensitivity { operation: String, position: usize },

    #[error("invalid argument to `{operation}`: {reason}")]
    InvalidArgument { operation: String, reason: String },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl AutodiffError {
    pub(crate) fn invalid(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AutodiffError>;
