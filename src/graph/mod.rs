pub mod engine;
pub mod intercept;
pub mod node;
pub mod op;
pub mod plot;
pub mod registry;
pub mod tape;

pub use engine::{
    Gradients, SweepOptions, grad, gradient, gradient_with, gradient_with_seed, reverse_sweep,
};
pub use intercept::{shared_tape, tracked_slots};
pub use node::{Arg, Node};
pub use op::{Arity, Context, Differentiable, Kwargs, Pullback, Signature};
pub use plot::{TapeVisualization, TapeVisualizer, VisualizationConfig};
pub use registry::Registry;
pub use tape::{Branch, Record, Source, Tape, TapeId};
