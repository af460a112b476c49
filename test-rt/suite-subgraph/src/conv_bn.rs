use infra::{InputSpec, SubgraphCase, TestSuite};
use stagediff_core::internal::*;
use stagediff_core::ops::cnn::Conv;
use stagediff_core::ops::element_wise::relu;
use stagediff_core::ops::nn::BatchNorm;

use crate::channel_const;

fn conv_bn_relu(name: &str, dt: DatumType) -> SubgraphCase {
    SubgraphCase::new(name)
        .with_input(InputSpec::uniform(dt, &[1, 3, 8, 8], -1.0, 1.0))
        .with_input(InputSpec::uniform(dt, &[4, 3, 3, 3], -0.5, 0.5))
        .with_input(InputSpec::uniform(dt, &[4], -0.1, 0.1))
        .with_net(move |model, inputs| {
            let conv = model.wire_node("conv", Conv::new([1, 1], [1, 1]), inputs)?;
            let scale = channel_const(model, "bn.scale", dt, &[1.0, 0.5, 2.0, 1.5])?;
            let bias = channel_const(model, "bn.bias", dt, &[0.0, 0.1, -0.2, 0.3])?;
            let mean = channel_const(model, "bn.mean", dt, &[0.05, -0.1, 0.0, 0.2])?;
            let var = channel_const(model, "bn.var", dt, &[1.0, 0.8, 1.2, 0.5])?;
            let bn = model.wire_node(
                "bn",
                BatchNorm::default(),
                &[conv[0], scale, bias, mean, var],
            )?;
            model.wire_node("relu", relu(), &bn)
        })
}

fn strided_conv() -> SubgraphCase {
    SubgraphCase::new("strided_conv")
        .with_input(InputSpec::uniform(DatumType::F32, &[2, 2, 9, 9], -1.0, 1.0))
        .with_input(InputSpec::uniform(DatumType::F32, &[3, 2, 3, 3], -1.0, 1.0))
        .with_net(|model, inputs| {
            let conv = model.wire_node("conv", Conv::new([2, 2], [0, 0]), inputs)?;
            model.wire_node("relu", relu(), &conv)
        })
}

pub fn suite() -> DiffResult<TestSuite> {
    let mut suite = TestSuite::default();
    suite.add("conv_bn_relu", conv_bn_relu("conv_bn_relu", DatumType::F32))?;
    suite.add("conv_bn_relu_f16", conv_bn_relu("conv_bn_relu_f16", DatumType::F16))?;
    suite.add("strided_conv", strided_conv())?;
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_shape() -> DiffResult<()> {
        let model = conv_bn_relu("sample", DatumType::F32).model()?;
        assert_eq!(model.output_fact(0)?.shape, tvec!(1, 4, 8, 8));
        assert_eq!(model.input_outlets().len(), 3);
        Ok(())
    }
}
