use crate::internal::*;
use stagediff_ndarray::{ArrayViewD, Axis};

/// Concatenation along an axis. Negative axes count from the end.
#[derive(Debug, Clone, new, PartialEq)]
pub struct Concat {
    pub axis: i64,
}

impl Concat {
    fn resolve_axis(&self, rank: usize) -> DiffResult<usize> {
        let rank = rank as i64;
        if 0 <= self.axis && self.axis < rank {
            Ok(self.axis as usize)
        } else if -rank <= self.axis && self.axis < 0 {
            Ok((self.axis + rank) as usize)
        } else {
            bail!("Illegal combination of values for rank and axis: {} and {}", rank, self.axis)
        }
    }

    fn eval_t<T: Datum>(&self, axis: usize, inputs: &[TValue]) -> DiffResult<Tensor> {
        let views = inputs.iter().map(|t| t.to_array_view::<T>()).collect::<DiffResult<Vec<ArrayViewD<T>>>>()?;
        Ok(stagediff_ndarray::concatenate(Axis(axis), &views)?.into())
    }
}

impl Op for Concat {
    fn name(&self) -> Cow<'_, str> {
        "Concat".into()
    }

    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![format!("axis: {}", self.axis)])
    }
}

impl EvalOp for Concat {
    fn eval(&self, inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        ensure!(!inputs.is_empty(), "Concat needs at least one input");
        let dt = inputs[0].datum_type();
        ensure!(inputs.iter().all(|t| t.datum_type() == dt), "Concat inputs must share a datum type");
        let axis = self.resolve_axis(inputs[0].rank())?;
        let output = dispatch_datum!(Self::eval_t(dt)(self, axis, &inputs))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}

impl TypedOp for Concat {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(!inputs.is_empty(), "Concat needs at least one input");
        let first = inputs[0];
        let axis = self.resolve_axis(first.rank())?;
        let mut shape = first.shape.clone();
        shape[axis] = 0;
        for input in inputs {
            ensure!(
                input.datum_type == first.datum_type,
                "Concat inputs must share a datum type, got {:?} and {:?}",
                first.datum_type,
                input.datum_type
            );
            ensure!(
                input.rank() == first.rank()
                    && (0..first.rank()).all(|ax| ax == axis || input.shape[ax] == first.shape[ax]),
                "Incompatible shapes for concat on axis {}: {:?} and {:?}",
                axis,
                first.shape,
                input.shape
            );
            shape[axis] += input.shape[axis];
        }
        Ok(tvec!(TypedFact::dt_shape(first.datum_type, &shape)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_negative_axis() -> DiffResult<()> {
        let a = tensor2(&[[1i32, 2], [3, 4]]).into_arc_tensor();
        let b = tensor2(&[[5i32], [6]]).into_arc_tensor();
        let out = Concat::new(-1).eval(tvec!(a, b))?;
        assert_eq!(*out[0], tensor2(&[[1i32, 2, 5], [3, 4, 6]]));
        Ok(())
    }

    #[test]
    fn facts() -> DiffResult<()> {
        let a = TypedFact::shape::<f32>(&[1, 2, 4]);
        let b = TypedFact::shape::<f32>(&[1, 3, 4]);
        let out = Concat::new(1).output_facts(&[&a, &b])?;
        assert_eq!(out[0], TypedFact::shape::<f32>(&[1, 5, 4]));
        assert!(Concat::new(2).output_facts(&[&a, &b]).is_err());
        assert!(Concat::new(3).output_facts(&[&a, &a]).is_err());
        Ok(())
    }
}
