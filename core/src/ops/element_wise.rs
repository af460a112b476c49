use crate::internal::*;
use crate::ops::binary;
use num_traits::Float;

/// Scalar function of a unary element-wise op. Defined on floats only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryMiniOp {
    Relu,
    Neg,
    Abs,
    Exp,
    Recip,
    Sqrt,
    Sigmoid,
}

impl UnaryMiniOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryMiniOp::Relu => "Relu",
            UnaryMiniOp::Neg => "Neg",
            UnaryMiniOp::Abs => "Abs",
            UnaryMiniOp::Exp => "Exp",
            UnaryMiniOp::Recip => "Recip",
            UnaryMiniOp::Sqrt => "Sqrt",
            UnaryMiniOp::Sigmoid => "Sigmoid",
        }
    }

    #[inline]
    pub fn eval_scalar<T: Float>(&self, x: T) -> T {
        match self {
            UnaryMiniOp::Relu => {
                if x > T::zero() {
                    x
                } else {
                    T::zero()
                }
            }
            UnaryMiniOp::Neg => -x,
            UnaryMiniOp::Abs => x.abs(),
            UnaryMiniOp::Exp => x.exp(),
            UnaryMiniOp::Recip => x.recip(),
            UnaryMiniOp::Sqrt => x.sqrt(),
            UnaryMiniOp::Sigmoid => (T::one() + (-x).exp()).recip(),
        }
    }

    pub fn eval(&self, t: &Tensor) -> DiffResult<Tensor> {
        fn eval_t<T: Datum + Float>(op: UnaryMiniOp, t: &Tensor) -> DiffResult<Tensor> {
            Ok(t.to_array_view::<T>()?.mapv(|x| op.eval_scalar(x)).into())
        }
        dispatch_floatlike!(eval_t(t.datum_type())(*self, t))
    }
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct ElementWiseOp(pub UnaryMiniOp);

impl Op for ElementWiseOp {
    fn name(&self) -> Cow<'_, str> {
        self.0.name().into()
    }
}

impl EvalOp for ElementWiseOp {
    fn eval(&self, mut inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        let t = args_1!(inputs);
        Ok(tvec!(self.0.eval(&t)?.into_arc_tensor()))
    }
}

impl TypedOp for ElementWiseOp {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(inputs.len() == 1, "{} expects 1 input", self.0.name());
        ensure!(
            inputs[0].datum_type.is_float(),
            "{} is defined on floats, got {:?}",
            self.0.name(),
            inputs[0].datum_type
        );
        Ok(tvec!(inputs[0].without_value()))
    }

    fn decompose(
        &self,
        target: &mut TypedModel,
        prefix: &str,
        inputs: &[OutletId],
    ) -> DiffResult<Option<TVec<OutletId>>> {
        if self.0 != UnaryMiniOp::Sigmoid {
            return Ok(None);
        }
        let dt = target.outlet_fact(inputs[0])?.datum_type;
        let one = tensor0(1f64).cast_to_dt(dt)?.into_owned();
        let one = target.add_const(format!("{prefix}.one"), one)?;
        let neg = target.wire_node(format!("{prefix}.neg"), neg(), inputs)?;
        let exp = target.wire_node(format!("{prefix}.exp"), exp(), &neg)?;
        let denum = target.wire_node(format!("{prefix}.denum"), binary::add(), &[exp[0], one])?;
        target.wire_node(format!("{prefix}.recip"), recip(), &denum).map(Some)
    }

    fn as_element_wise(&self) -> Option<ElementWiseKind> {
        Some(ElementWiseKind::Unary(self.0))
    }
}

macro_rules! element_wise_ctor {
    ($($func:ident => $op:ident),*) => {
        $(
            pub fn $func() -> ElementWiseOp {
                ElementWiseOp(UnaryMiniOp::$op)
            }
        )*
    };
}

element_wise_ctor!(
    relu => Relu,
    neg => Neg,
    abs => Abs,
    exp => Exp,
    recip => Recip,
    sqrt => Sqrt,
    sigmoid => Sigmoid
);
