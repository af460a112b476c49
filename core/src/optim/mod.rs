//! Model lowerings.
//!
//! Each lowering rebuilds the model through a `Translate` pass and leaves
//! the input and output interface untouched.
use crate::internal::*;

mod decompose;
mod fuse;
mod prop_const;

pub use self::decompose::Decompose;
pub use self::fuse::Fuse;
pub use self::prop_const::PropConst;

impl TypedModel {
    /// Lower composite ops to primitive ones, then fold constants.
    pub fn into_decomposed(self) -> DiffResult<TypedModel> {
        let model = Decompose.translate_model(&self)?;
        let model = PropConst.translate_model(&model)?;
        debug!("Decomposed model: {} nodes, was {}", model.nodes().len(), self.nodes().len());
        Ok(model)
    }

    /// Fold nodes computable at build time into constants.
    pub fn into_const_folded(self) -> DiffResult<TypedModel> {
        PropConst.translate_model(&self)
    }

    /// Merge element-wise chains. With `fallback`, fused nodes still
    /// evaluate op by op.
    pub fn into_fused(self, fallback: bool) -> DiffResult<TypedModel> {
        let model = Fuse::analyse(&self, fallback).translate_model(&self)?;
        debug!(
            "Fused model: {} nodes, was {} (fallback: {fallback})",
            model.nodes().len(),
            self.nodes().len()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use crate::internal::*;
    use crate::ops::binary;
    use crate::ops::element_wise;
    use crate::ops::fused::FusedElementWise;
    use crate::ops::nn::BatchNorm;

    fn bn_relu() -> DiffResult<TypedModel> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>(&[1, 2, 2, 2]))?;
        let mut wires = tvec!(x);
        for (name, v) in [("scale", [1f32, 2.]), ("bias", [0.5, -0.5]), ("mean", [0.1, 0.2]), ("var", [1., 4.])] {
            wires.push(model.add_const(name, tensor1(&v))?);
        }
        let bn = model.wire_node("bn", BatchNorm::default(), &wires)?;
        let relu = model.wire_node("relu", element_wise::relu(), &bn)?;
        model.set_output_outlets(&relu)?;
        Ok(model)
    }

    fn input() -> TValue {
        Tensor::from_shape(&[1, 2, 2, 2], &[-1f32, -0.5, 0., 0.5, 1., 1.5, 2., 2.5]).unwrap().into()
    }

    fn run(model: TypedModel) -> DiffResult<Tensor> {
        let mut out = SimplePlan::new(model)?.run(tvec!(input()))?;
        Ok(Arc::unwrap_or_clone(out.remove(0)))
    }

    #[test]
    fn decomposition_leaves_primitives_only() -> DiffResult<()> {
        let model = bn_relu()?.into_decomposed()?;
        model.check_consistency()?;
        assert_eq!(model.count_ops::<BatchNorm>(), 0);
        assert_eq!(model.count_ops::<binary::TypedBinOp>(), 3);
        Ok(())
    }

    #[test]
    fn fusion_merges_the_tail() -> DiffResult<()> {
        let eager = run(bn_relu()?)?;
        for fallback in [true, false] {
            let model = bn_relu()?.into_decomposed()?.into_fused(fallback)?;
            model.check_consistency()?;
            assert_eq!(model.count_ops::<FusedElementWise>(), 1);
            assert_eq!(model.count_ops::<binary::TypedBinOp>(), 0);
            let fused = run(model)?;
            let (a, b) = (eager.as_slice::<f32>()?, fused.as_slice::<f32>()?);
            for (a, b) in a.iter().zip(b) {
                approx::assert_abs_diff_eq!(a, b, epsilon = 1e-6);
            }
        }
        Ok(())
    }

    #[test]
    fn model_outputs_stop_chains() -> DiffResult<()> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>(&[3]))?;
        let a = model.wire_node("a", element_wise::abs(), &[x])?;
        let b = model.wire_node("b", element_wise::exp(), &a)?;
        model.set_output_outlets(&[a[0], b[0]])?;
        let fused = model.into_fused(false)?;
        assert_eq!(fused.count_ops::<FusedElementWise>(), 0);
        Ok(())
    }

    #[test]
    fn integer_chains_are_not_fused() -> DiffResult<()> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<i32>(&[3]))?;
        let one = model.add_const("one", tensor0(1i32))?;
        let a = model.wire_node("a", binary::add(), &[x, one])?;
        let b = model.wire_node("b", binary::mul(), &[a[0], one])?;
        model.set_output_outlets(&b)?;
        let fused = model.into_fused(false)?;
        assert_eq!(fused.count_ops::<FusedElementWise>(), 0);
        assert_eq!(fused.count_ops::<binary::TypedBinOp>(), 2);
        Ok(())
    }

    #[test]
    fn fold_constants() -> DiffResult<()> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>(&[2]))?;
        let a = model.add_const("a", tensor1(&[1f32, 4.]))?;
        let s = model.wire_node("s", element_wise::sqrt(), &[a])?;
        let y = model.wire_node("y", binary::add(), &[x, s[0]])?;
        model.set_output_outlets(&y)?;
        let folded = model.into_const_folded()?;
        assert_eq!(folded.count_ops::<element_wise::ElementWiseOp>(), 0);
        assert_eq!(folded.node_by_name("s")?.outputs[0].konst, Some(rctensor1(&[1f32, 2.])));
        Ok(())
    }
}
