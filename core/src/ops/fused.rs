use crate::broadcast::multi_broadcast;
use crate::internal::*;
use crate::ops::binary::BinMiniOp;
use crate::ops::element_wise::UnaryMiniOp;
use itertools::Itertools;
use num_traits::Float;
use stagediff_ndarray::{ArrayD, ArrayViewD, IxDyn};

/// One step of a fused element-wise chain, applied to the running value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FusedStep {
    Unary(UnaryMiniOp),
    /// Combine the running value with the op input at index `input`.
    /// `chain_lhs` tells on which side the running value goes.
    Binary { op: BinMiniOp, input: usize, chain_lhs: bool },
}

impl fmt::Display for FusedStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FusedStep::Unary(op) => write!(f, "{}", op.name()),
            FusedStep::Binary { op, input, chain_lhs: true } => write!(f, "{}(_, #{input})", op.name()),
            FusedStep::Binary { op, input, chain_lhs: false } => write!(f, "{}(#{input}, _)", op.name()),
        }
    }
}

/// A chain of float element-wise ops evaluated as one node.
///
/// The running value starts from input 0. With `fallback` set, each step is
/// evaluated on whole tensors like the original ops would, otherwise the
/// whole chain runs per output element in a single pass.
#[derive(Debug, Clone, PartialEq, new)]
pub struct FusedElementWise {
    pub steps: Vec<FusedStep>,
    pub fallback: bool,
}

impl FusedElementWise {
    fn eval_fallback(&self, inputs: &[TValue]) -> DiffResult<Tensor> {
        let mut acc: Tensor = (*inputs[0]).clone();
        for step in &self.steps {
            acc = match *step {
                FusedStep::Unary(op) => op.eval(&acc)?,
                FusedStep::Binary { op, input, chain_lhs: true } => op.eval(&acc, &inputs[input])?,
                FusedStep::Binary { op, input, chain_lhs: false } => {
                    op.eval(&inputs[input], &acc)?
                }
            }
        }
        Ok(acc)
    }

    fn eval_kernel<T: Datum + Float>(&self, inputs: &[TValue]) -> DiffResult<Tensor> {
        let shape = multi_broadcast(&inputs.iter().map(|t| t.shape()).collect::<TVec<_>>())?;
        let views =
            inputs.iter().map(|t| t.to_array_view::<T>()).collect::<DiffResult<TVec<_>>>()?;
        let views = views
            .iter()
            .map(|v| {
                v.broadcast(&*shape)
                    .with_context(|| format!("Broadcasting {:?} to {shape:?}", v.shape()))
            })
            .collect::<DiffResult<TVec<ArrayViewD<T>>>>()?;
        let output = ArrayD::from_shape_fn(IxDyn(&shape), |ix| {
            let mut acc = views[0][&ix];
            for step in &self.steps {
                acc = match *step {
                    FusedStep::Unary(op) => op.eval_scalar(acc),
                    FusedStep::Binary { op, input, chain_lhs: true } => {
                        op.eval_scalar(acc, views[input][&ix])
                    }
                    FusedStep::Binary { op, input, chain_lhs: false } => {
                        op.eval_scalar(views[input][&ix], acc)
                    }
                }
            }
            acc
        });
        Ok(output.into())
    }
}

impl Op for FusedElementWise {
    fn name(&self) -> Cow<'_, str> {
        "FusedElementWise".into()
    }

    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![
            self.steps.iter().join(" -> "),
            format!("fallback: {}", self.fallback),
        ])
    }
}

impl EvalOp for FusedElementWise {
    fn eval(&self, inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        ensure!(!inputs.is_empty(), "FusedElementWise needs at least one input");
        let output = if self.fallback {
            self.eval_fallback(&inputs)?
        } else {
            dispatch_floatlike!(Self::eval_kernel(inputs[0].datum_type())(self, &inputs))?
        };
        Ok(tvec!(output.into_arc_tensor()))
    }
}

impl TypedOp for FusedElementWise {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(!inputs.is_empty(), "FusedElementWise needs at least one input");
        let dt = inputs[0].datum_type;
        ensure!(dt.is_float(), "Only float chains are fused, got {:?}", dt);
        ensure!(
            inputs.iter().all(|i| i.datum_type == dt),
            "Fused inputs must share a datum type: {:?}",
            inputs
        );
        for step in &self.steps {
            if let FusedStep::Binary { input, .. } = step {
                ensure!(*input < inputs.len(), "Fused step refers to missing input #{input}");
            }
        }
        let shape = multi_broadcast(&inputs.iter().map(|i| &*i.shape).collect::<TVec<_>>())?;
        Ok(tvec!(TypedFact::dt_shape(dt, &shape)))
    }
}
