use tapegrad::graph::TapeVisualization;
use tapegrad::{Arg, AutodiffError, Kwargs, Registry, Result, Tape, Value, gradient};

fn main() -> Result<()> {
    // Example usage of the automatic differentiation engine
    let registry = Registry::with_builtins()?;

    // add(x, x) at x = 3 and mul(a, b) at (2, 3)
    let scratch = Tape::new();
    let x = scratch.leaf(3.0);
    let a = scratch.leaf(2.0);
    let b = scratch.leaf(3.0);
    let doubled = registry.call("add", [&x, &x])?;
    let product = registry.call("mul", [&a, &b])?;
    if let (Some(y), Some(z)) = (doubled.as_node(), product.as_node()) {
        let dy = gradient(y, &[&x])?;
        let dz = gradient(z, &[&a, &b])?;
        println!("add(x, x) = {}, dx = {:?}", y.value(), dy.get(&x));
        println!("mul(a, b) = {}, [da, db] = {:?}", z.value(), dz.into_values());
    }
    scratch.plot_tape();
    println!();

    let tape = Tape::new();

    let x = tape.leaf(Value::from_vec(vec![1.0, 2.0, 3.0], &[3])?);
    let w = tape.leaf(Value::from_vec(vec![0.5, -0.2, 0.1], &[3])?);
    let b = tape.leaf(0.25);

    println!("Created leaves:");
    println!("X shape: {:?}", x.value().shape());
    println!("W shape: {:?}", w.value().shape());

    // Forward pass: loss = tanh(x . w + b)^2
    let linear = registry.call("dot", [&x, &w])?;
    let shifted = registry.call("add", [linear, Arg::from(&b)])?;
    let activated = registry.call("tanh", [shifted])?;
    let loss = registry
        .call_with("pow", [activated], &Kwargs::new().with("exponent", 2.0))?
        .into_node()
        .ok_or_else(|| AutodiffError::InvalidArgument {
            operation: "pow".to_string(),
            reason: "loss is not on the tape".to_string(),
        })?;

    println!("\nForward pass completed");
    println!("Loss value: {}", loss.value());

    // Backward pass
    let grads = gradient(&loss, &[&x, &w, &b])?;

    println!("\nBackward pass completed");
    for (name, node) in [("x", &x), ("w", &w), ("b", &b)] {
        if let Some(g) = grads.get(node) {
            println!("Gradient w.r.t. {}: {}", name, g);
        }
    }

    // Untracked calls never touch the tape
    let before = tape.len();
    let plain = registry.call("mul", [2.0, 3.0])?;
    println!("\nPlain mul: {} (tape length {} -> {})", plain.value(), before, tape.len());

    println!();
    tape.plot_tape();
    Ok(())
}
