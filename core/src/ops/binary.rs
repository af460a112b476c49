use crate::broadcast::multi_broadcast;
use crate::internal::*;
use num_traits::Num;
use stagediff_ndarray::Zip;

/// Scalar function of a binary element-wise op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinMiniOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
}

impl BinMiniOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinMiniOp::Add => "Add",
            BinMiniOp::Sub => "Sub",
            BinMiniOp::Mul => "Mul",
            BinMiniOp::Div => "Div",
            BinMiniOp::Max => "Max",
            BinMiniOp::Min => "Min",
        }
    }

    #[inline]
    pub fn eval_scalar<T: Num + Copy + PartialOrd>(&self, a: T, b: T) -> T {
        match self {
            BinMiniOp::Add => a + b,
            BinMiniOp::Sub => a - b,
            BinMiniOp::Mul => a * b,
            BinMiniOp::Div => a / b,
            BinMiniOp::Max => {
                if a >= b {
                    a
                } else {
                    b
                }
            }
            BinMiniOp::Min => {
                if a <= b {
                    a
                } else {
                    b
                }
            }
        }
    }

    /// Evaluate with numpy-style broadcasting. Both operands must share a
    /// datum type.
    pub fn eval(&self, a: &Tensor, b: &Tensor) -> DiffResult<Tensor> {
        ensure!(
            a.datum_type() == b.datum_type(),
            "{} operands must have the same type, got {:?} and {:?}",
            self.name(),
            a.datum_type(),
            b.datum_type()
        );
        let shape = multi_broadcast(&[a.shape(), b.shape()])?;
        dispatch_numbers!(eval_t(a.datum_type())(*self, a, b, &shape))
    }
}

fn eval_t<T: Datum + Num + Copy + PartialOrd>(
    op: BinMiniOp,
    a: &Tensor,
    b: &Tensor,
    shape: &[usize],
) -> DiffResult<Tensor> {
    let a = a.to_array_view::<T>()?;
    let b = b.to_array_view::<T>()?;
    if op == BinMiniOp::Div && T::datum_type().is_integer() && b.iter().any(|x| x.is_zero()) {
        bail!("Integer division by zero");
    }
    let a = a.broadcast(shape).with_context(|| format!("Broadcasting {:?} to {shape:?}", a.shape()))?;
    let b = b.broadcast(shape).with_context(|| format!("Broadcasting {:?} to {shape:?}", b.shape()))?;
    Ok(Zip::from(&a).and(&b).map_collect(|a, b| op.eval_scalar(*a, *b)).into())
}

#[derive(Debug, Clone, PartialEq, new)]
pub struct TypedBinOp(pub BinMiniOp);

impl Op for TypedBinOp {
    fn name(&self) -> Cow<'_, str> {
        self.0.name().into()
    }
}

impl EvalOp for TypedBinOp {
    fn eval(&self, mut inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        let (a, b) = args_2!(inputs);
        Ok(tvec!(self.0.eval(&a, &b)?.into_arc_tensor()))
    }
}

impl TypedOp for TypedBinOp {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(inputs.len() == 2, "{} expects 2 inputs", self.0.name());
        ensure!(
            inputs[0].datum_type == inputs[1].datum_type,
            "{} operands must have the same type, got {:?} and {:?}",
            self.0.name(),
            inputs[0].datum_type,
            inputs[1].datum_type
        );
        ensure!(inputs[0].datum_type.is_number(), "{:?} is not a number", inputs[0].datum_type);
        let shape = multi_broadcast(&[&*inputs[0].shape, &*inputs[1].shape])?;
        Ok(tvec!(TypedFact::dt_shape(inputs[0].datum_type, &shape)))
    }

    fn as_element_wise(&self) -> Option<ElementWiseKind> {
        Some(ElementWiseKind::Binary(self.0))
    }
}

macro_rules! bin_ctor {
    ($($func:ident => $op:ident),*) => {
        $(
            pub fn $func() -> TypedBinOp {
                TypedBinOp(BinMiniOp::$op)
            }
        )*
    };
}

bin_ctor!(add => Add, sub => Sub, mul => Mul, div => Div, max => Max, min => Min);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_row() -> DiffResult<()> {
        let a = tensor2(&[[1f32, 2.], [3., 4.]]);
        let b = tensor1(&[10f32, 20.]);
        let c = BinMiniOp::Add.eval(&a, &b)?;
        assert_eq!(c, tensor2(&[[11f32, 22.], [13., 24.]]));
        Ok(())
    }

    #[test]
    fn max_min_i32() -> DiffResult<()> {
        let a = tensor1(&[1i32, 5, -3]);
        let b = tensor1(&[2i32, 4, -3]);
        assert_eq!(BinMiniOp::Max.eval(&a, &b)?, tensor1(&[2i32, 5, -3]));
        assert_eq!(BinMiniOp::Min.eval(&a, &b)?, tensor1(&[1i32, 4, -3]));
        Ok(())
    }

    #[test]
    fn int_div_by_zero_is_an_error() {
        let a = tensor1(&[1i32, 2]);
        let b = tensor1(&[1i32, 0]);
        assert!(BinMiniOp::Div.eval(&a, &b).is_err());
    }

    #[test]
    fn mixed_types_are_rejected() {
        let a = tensor1(&[1i32]);
        let b = tensor1(&[1f32]);
        assert!(BinMiniOp::Add.eval(&a, &b).is_err());
        assert!(
            TypedBinOp(BinMiniOp::Add)
                .output_facts(&[&TypedFact::shape::<i32>(&[1]), &TypedFact::shape::<f32>(&[1])])
                .is_err()
        );
    }

    #[test]
    fn bool_is_not_a_number() {
        let a = tensor1(&[true]);
        assert!(BinMiniOp::Add.eval(&a, &a).is_err());
    }
}
