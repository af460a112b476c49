use crate::internal::*;
use crate::ops::cnn::wire_reshape_as_channel;
use crate::ops::{binary, element_wise};
use num_traits::Float;
use stagediff_ndarray::{ArrayD, IxDyn, Zip};

/// Inference batch normalization over axis 1.
///
/// Inputs are `[x, scale, bias, mean, var]`, the last four being vectors of
/// the channel count.
#[derive(Debug, Clone, new, PartialEq)]
pub struct BatchNorm {
    pub epsilon: f32,
}

impl Default for BatchNorm {
    fn default() -> BatchNorm {
        BatchNorm { epsilon: 1e-5 }
    }
}

impl BatchNorm {
    fn eval_t<T: Datum + Float>(
        &self,
        x: &Tensor,
        scale: &Tensor,
        bias: &Tensor,
        mean: &Tensor,
        var: &Tensor,
    ) -> DiffResult<Tensor> {
        let x = x.to_array_view::<T>()?;
        let mut shape = vec![1; x.ndim()];
        shape[1] = x.shape()[1];
        let param = |t: &Tensor| -> DiffResult<ArrayD<T>> {
            Ok(t.to_array_view::<T>()?.to_owned().into_shape_with_order(IxDyn(&shape))?)
        };
        let (scale, bias, mean, var) = (param(scale)?, param(bias)?, param(mean)?, param(var)?);
        let eps = <T as num_traits::NumCast>::from(self.epsilon)
            .context("Epsilon does not fit the datum type")?;
        let mut output = x.to_owned();
        Zip::from(&mut output)
            .and_broadcast(&scale)
            .and_broadcast(&bias)
            .and_broadcast(&mean)
            .and_broadcast(&var)
            .for_each(|o, s, b, m, v| *o = (*o - *m) / (*v + eps).sqrt() * *s + *b);
        Ok(output.into())
    }
}

impl Op for BatchNorm {
    fn name(&self) -> Cow<'_, str> {
        "BatchNorm".into()
    }

    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![format!("epsilon: {}", self.epsilon)])
    }
}

impl EvalOp for BatchNorm {
    fn eval(&self, mut inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        let (x, scale, bias, mean, var) = args_5!(inputs);
        let output =
            dispatch_floatlike!(Self::eval_t(x.datum_type())(self, &x, &scale, &bias, &mean, &var))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}

impl TypedOp for BatchNorm {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(inputs.len() == 5, "BatchNorm expects 5 inputs, got {}", inputs.len());
        let x = inputs[0];
        ensure!(x.datum_type.is_float(), "BatchNorm is defined on floats, got {:?}", x.datum_type);
        ensure!(x.rank() >= 2, "BatchNorm input needs a channel axis, got {:?}", x);
        for param in &inputs[1..] {
            ensure!(
                param.datum_type == x.datum_type && param.shape[..] == [x.shape[1]],
                "BatchNorm parameter {:?} does not match {} channels of {:?}",
                param,
                x.shape[1],
                x.datum_type
            );
        }
        Ok(tvec!(x.without_value()))
    }

    fn decompose(
        &self,
        target: &mut TypedModel,
        prefix: &str,
        inputs: &[OutletId],
    ) -> DiffResult<Option<TVec<OutletId>>> {
        let fact = target.outlet_fact(inputs[0])?.clone();
        let rank = fact.rank();
        let scale = wire_reshape_as_channel(target, format!("{prefix}.scale"), inputs[1], rank)?;
        let bias = wire_reshape_as_channel(target, format!("{prefix}.bias"), inputs[2], rank)?;
        let mean = wire_reshape_as_channel(target, format!("{prefix}.mean"), inputs[3], rank)?;
        let var = wire_reshape_as_channel(target, format!("{prefix}.var"), inputs[4], rank)?;
        let eps = tensor0(self.epsilon as f64).cast_to_dt(fact.datum_type)?.into_owned();
        let eps = target.add_const(format!("{prefix}.epsilon"), eps)?;
        let wire = target.wire_node(format!("{prefix}.var_eps"), binary::add(), &[var, eps])?;
        let wire = target.wire_node(format!("{prefix}.std"), element_wise::sqrt(), &wire)?;
        let wire = target.wire_node(format!("{prefix}.inv_std"), element_wise::recip(), &wire)?;
        let factor =
            target.wire_node(format!("{prefix}.factor"), binary::mul(), &[scale, wire[0]])?[0];
        let centered =
            target.wire_node(format!("{prefix}.centered"), binary::sub(), &[inputs[0], mean])?;
        let scaled =
            target.wire_node(format!("{prefix}.scaled"), binary::mul(), &[centered[0], factor])?;
        target.wire_node(prefix, binary::add(), &[scaled[0], bias]).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn inputs() -> TVec<TValue> {
        let x = Tensor::from_shape(&[1, 2, 1, 2], &[1f32, 2., 3., 4.]).unwrap();
        tvec!(
            x.into_arc_tensor(),
            rctensor1(&[1f32, 2.]),
            rctensor1(&[0f32, 1.]),
            rctensor1(&[1.5f32, 3.5]),
            rctensor1(&[0.25f32, 0.25]),
        )
    }

    #[test]
    fn eager() -> DiffResult<()> {
        let out = BatchNorm::new(0.).eval(inputs())?;
        let expected = Tensor::from_shape(&[1, 2, 1, 2], &[-1f32, 1., -1., 3.])?;
        assert_eq!(*out[0], expected);
        Ok(())
    }

    #[test]
    fn decomposition_matches_eager() -> DiffResult<()> {
        let op = BatchNorm::default();
        let inputs = inputs();
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape_and_dt_of(&inputs[0]))?;
        let mut wires = tvec!(x);
        for (ix, p) in inputs[1..].iter().enumerate() {
            wires.push(model.add_const(format!("p{ix}"), p.clone())?);
        }
        let out = op.decompose(&mut model, "bn", &wires)?.unwrap();
        model.set_output_outlets(&out)?;
        assert_eq!(model.count_ops::<BatchNorm>(), 0);
        let found = SimplePlan::new(model)?.run(tvec!(inputs[0].clone()))?;
        let expected = op.eval(inputs)?;
        let found = found[0].to_array_view::<f32>()?;
        let expected = expected[0].to_array_view::<f32>()?;
        for (f, e) in found.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(f, e, epsilon = 1e-5);
        }
        Ok(())
    }
}
