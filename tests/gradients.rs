// End-to-end checks: recorded gradients against central finite differences of the
// same functions evaluated without any tape.
use approx::assert_abs_diff_eq;
use tapegrad::{Arg, AutodiffError, Kwargs, Registry, Result, Tape, Value, grad, gradient};

const STEP: f64 = 1e-6;
const TOLERANCE: f64 = 1e-5;

fn nudge(value: &Value, index: usize, delta: f64) -> Value {
    if value.is_scalar() {
        return Value::scalar(value.sum() + delta);
    }
    let mut data = value.to_vec();
    data[index] += delta;
    Value::from_vec(data, value.shape()).unwrap()
}

// Central differences of `f` evaluated on plain values.
fn numeric_gradient<F>(f: F, inputs: &[Value]) -> Vec<Vec<f64>>
where
    F: Fn(Vec<Arg>) -> Result<Arg>,
{
    let eval = |values: Vec<Value>| -> f64 {
        let out = f(values.into_iter().map(Arg::from).collect()).unwrap();
        assert!(!out.is_tracked(), "plain inputs must not be recorded");
        out.value().sum()
    };

    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            (0..input.len().max(1))
                .map(|j| {
                    let mut plus = inputs.to_vec();
                    let mut minus = inputs.to_vec();
                    plus[i] = nudge(input, j, STEP);
                    minus[i] = nudge(input, j, -STEP);
                    (eval(plus) - eval(minus)) / (2.0 * STEP)
                })
                .collect()
        })
        .collect()
}

fn check_against_finite_differences<F>(f: F, inputs: &[Value])
where
    F: Fn(Vec<Arg>) -> Result<Arg>,
{
    let (_, analytic) = grad(|nodes| f(nodes.iter().map(Arg::from).collect()), inputs).unwrap();
    let numeric = numeric_gradient(&f, inputs);

    for (a, n) in analytic.iter().zip(&numeric) {
        for (x, y) in a.to_vec().iter().zip(n) {
            assert_abs_diff_eq!(*x, *y, epsilon = TOLERANCE);
        }
    }
}

#[test]
fn test_elementwise_chain_on_arrays() {
    let registry = Registry::with_builtins().unwrap();
    let f = |args: Vec<Arg>| -> Result<Arg> {
        let (a, b) = (args[0].clone(), args[1].clone());
        let t = registry.call("tanh", [a.clone()])?;
        let e = registry.call("exp", [b])?;
        let prod = registry.call("mul", [t, e])?;
        let s = registry.call("sin", [a])?;
        let total = registry.call("add", [prod, s])?;
        registry.call("sum_all", [total])
    };
    check_against_finite_differences(f, &[Value::randn(&[4]), Value::randn(&[4])]);
}

#[test]
fn test_scalar_chain_with_keywords() {
    let registry = Registry::with_builtins().unwrap();
    let square = Kwargs::new().with("exponent", 2.0);
    let f = |args: Vec<Arg>| -> Result<Arg> {
        let x = args[0].clone();
        let sq = registry.call_with("pow", [x.clone()], &square)?;
        let shifted = registry.call("add", [sq, Arg::from(1.0)])?;
        let log = registry.call("ln", [shifted])?;
        let c = registry.call("cos", [x])?;
        registry.call("mul", [log, c])
    };
    check_against_finite_differences(f, &[Value::scalar(0.8)]);
    check_against_finite_differences(f, &[Value::scalar(-1.3)]);
}

#[test]
fn test_quotient_and_differences() {
    let registry = Registry::with_builtins().unwrap();
    let f = |args: Vec<Arg>| -> Result<Arg> {
        let (x, y) = (args[0].clone(), args[1].clone());
        let num = registry.call("sub", [x.clone(), y.clone()])?;
        let den = registry.call("exp", [y])?;
        let q = registry.call("div", [num, den])?;
        let scaled = registry.call("scale", [Arg::from(3.0), q])?;
        let flipped = registry.call("neg", [x])?;
        let total = registry.call("add", [scaled, flipped])?;
        registry.call("sum_all", [total])
    };
    check_against_finite_differences(f, &[Value::randn(&[2, 3]), Value::randn(&[2, 3])]);
}

#[test]
fn test_variadic_reductions() {
    let registry = Registry::with_builtins().unwrap();
    let f = |args: Vec<Arg>| -> Result<Arg> {
        let (x, y, z) = (args[0].clone(), args[1].clone(), args[2].clone());
        let xy = registry.call("mul", [x.clone(), y.clone()])?;
        let top = registry.call("max", [xy.clone(), z.clone(), Arg::from(-10.0)])?;
        registry.call("sum", [top, xy, z, Arg::from(0.5), x])
    };
    // Well separated so the argmax is stable under the finite-difference step.
    check_against_finite_differences(
        f,
        &[Value::scalar(1.5), Value::scalar(2.0), Value::scalar(0.7)],
    );
}

#[test]
fn test_dot_with_broadcast_scalar() {
    let registry = Registry::with_builtins().unwrap();
    let f = |args: Vec<Arg>| -> Result<Arg> {
        let (v, w, s) = (args[0].clone(), args[1].clone(), args[2].clone());
        let shifted = registry.call("add", [v.clone(), s])?;
        let d = registry.call("dot", [shifted, w])?;
        registry.call("tanh", [d])
    };
    check_against_finite_differences(
        f,
        &[Value::randn(&[5]), Value::randn(&[5]), Value::scalar(0.2)],
    );
}

#[test]
fn test_registry_is_shared_across_tapes() {
    let registry = Registry::with_builtins().unwrap();

    let first = Tape::new();
    let second = Tape::new();
    let x = first.leaf(2.0);
    let y = second.leaf(5.0);

    let fx = registry.call("mul", [&x, &x]).unwrap().into_node().unwrap();
    let fy = registry.call("mul", [&y, &y]).unwrap().into_node().unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);

    let gx = gradient(&fx, &[&x]).unwrap();
    let gy = gradient(&fy, &[&y]).unwrap();
    assert_eq!(gx.get(&x), Some(&Value::scalar(4.0)));
    assert_eq!(gy.get(&y), Some(&Value::scalar(10.0)));
    // A node from one tape has no entry in the other tape's result.
    assert_eq!(gx.get(&y), None);

    assert!(matches!(
        registry.call("add", [&fx, &fy]),
        Err(AutodiffError::GraphMismatch { .. })
    ));
}

#[test]
fn test_sweep_can_be_repeated() {
    let registry = Registry::with_builtins().unwrap();
    let tape = Tape::new();
    let x = tape.leaf(0.4);
    let y = registry.call("sin", [&x]).unwrap().into_node().unwrap();

    let once = gradient(&y, &[&x]).unwrap();
    let twice = gradient(&y, &[&x]).unwrap();
    assert_eq!(once.get(&x), twice.get(&x));
    assert_abs_diff_eq!(once.get(&x).unwrap().sum(), 0.4f64.cos(), epsilon = 1e-12);

    // Gradients of an intermediate ignore anything recorded after it.
    let z = registry.call("exp", [&y]).unwrap().into_node().unwrap();
    let partial = gradient(&y, &[&x, &z]).unwrap();
    assert_eq!(partial.get(&x), once.get(&x));
    assert_eq!(partial.get(&z), Some(&Value::scalar(0.0)));
}
