use infra::{InputSpec, SubgraphCase, TestSuite};
use stagediff_core::internal::*;
use stagediff_core::ops::binary::{add, max, min, mul, sub};
use stagediff_core::ops::element_wise::{abs, neg, sigmoid};

use crate::channel_const;

/// `sigmoid(x * k + b) - x`, an element-wise chain broken by a broadcast
/// operand.
fn sigmoid_chain(name: &str, dt: DatumType) -> SubgraphCase {
    SubgraphCase::new(name)
        .with_input(InputSpec::uniform(dt, &[4, 16], -2.0, 2.0))
        .with_input(InputSpec::uniform(dt, &[16], -0.5, 0.5))
        .with_net(move |model, inputs| {
            let k = channel_const(model, "k", dt, &[0.75])?;
            let scaled = model.wire_node("scale", mul(), &[inputs[0], k])?;
            let biased = model.wire_node("bias", add(), &[scaled[0], inputs[1]])?;
            let sig = model.wire_node("sigmoid", sigmoid(), &biased)?;
            model.wire_node("residual", sub(), &[sig[0], inputs[0]])
        })
}

fn clamp_abs() -> SubgraphCase {
    SubgraphCase::new("clamp_abs")
        .with_input(InputSpec::uniform(DatumType::F32, &[3, 5, 7], -4.0, 4.0))
        .with_net(|model, inputs| {
            let lo = model.add_const("lo", tensor0(-1.5f32))?;
            let hi = model.add_const("hi", tensor0(2.5f32))?;
            let x = model.wire_node("max", max(), &[inputs[0], lo])?;
            let x = model.wire_node("min", min(), &[x[0], hi])?;
            let x = model.wire_node("neg", neg(), &x)?;
            model.wire_node("abs", abs(), &x)
        })
}

/// Two outputs sharing a prefix: the shared node must stay visible.
fn shared_prefix() -> SubgraphCase {
    SubgraphCase::new("shared_prefix")
        .with_input(InputSpec::uniform(DatumType::F32, &[8], -1.0, 1.0))
        .with_net(|model, inputs| {
            let a = model.wire_node("sig", sigmoid(), inputs)?;
            let b = model.wire_node("twice", add(), &[a[0], a[0]])?;
            Ok(tvec!(a[0], b[0]))
        })
}

pub fn suite() -> DiffResult<TestSuite> {
    let mut suite = TestSuite::default();
    suite.add("sigmoid_f32", sigmoid_chain("sigmoid_f32", DatumType::F32))?;
    suite.add("sigmoid_f16", sigmoid_chain("sigmoid_f16", DatumType::F16))?;
    suite.add("clamp_abs", clamp_abs())?;
    suite.add("shared_prefix", shared_prefix())?;
    Ok(suite)
}
