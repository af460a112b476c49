use crate::internal::*;
use crate::ops::binary;
use num_traits::Float;
use stagediff_ndarray::{Array4, ArrayView1, Ix1, Ix4};

/// 2D convolution, NCHW input and OIHW kernel, with symmetric zero padding.
///
/// Inputs are `[input, kernel]` or `[input, kernel, bias]`.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Conv {
    pub strides: [usize; 2],
    pub padding: [usize; 2],
}

impl Default for Conv {
    fn default() -> Conv {
        Conv { strides: [1, 1], padding: [0, 0] }
    }
}

impl Conv {
    pub fn output_shape(&self, input: &[usize], kernel: &[usize]) -> DiffResult<TVec<usize>> {
        ensure!(input.len() == 4, "Conv expects a NCHW input, got {:?}", input);
        ensure!(kernel.len() == 4, "Conv expects an OIHW kernel, got {:?}", kernel);
        ensure!(
            input[1] == kernel[1],
            "Input has {} channels, kernel expects {}",
            input[1],
            kernel[1]
        );
        let mut shape = tvec!(input[0], kernel[0]);
        for ax in 0..2 {
            let padded = input[2 + ax] + 2 * self.padding[ax];
            ensure!(self.strides[ax] > 0, "Stride must be positive");
            ensure!(
                padded >= kernel[2 + ax],
                "Kernel {:?} does not fit in padded input {:?}",
                kernel,
                input
            );
            shape.push((padded - kernel[2 + ax]) / self.strides[ax] + 1);
        }
        Ok(shape)
    }

    fn eval_t<T: Datum + Float>(
        &self,
        input: &Tensor,
        kernel: &Tensor,
        bias: Option<&Tensor>,
    ) -> DiffResult<Tensor> {
        let input = input.to_array_view::<T>()?.into_dimensionality::<Ix4>()?;
        let kernel = kernel.to_array_view::<T>()?.into_dimensionality::<Ix4>()?;
        let bias: Option<ArrayView1<T>> = match bias {
            Some(b) => Some(b.to_array_view::<T>()?.into_dimensionality::<Ix1>()?),
            None => None,
        };
        let shape = self.output_shape(input.shape(), kernel.shape())?;
        let (channels, kh, kw) = (kernel.shape()[1], kernel.shape()[2], kernel.shape()[3]);
        let (h, w) = (input.shape()[2] as isize, input.shape()[3] as isize);
        let output = Array4::from_shape_fn((shape[0], shape[1], shape[2], shape[3]), |(n, o, y, x)| {
            let mut acc = T::zero();
            for c in 0..channels {
                for ky in 0..kh {
                    let iy = (y * self.strides[0] + ky) as isize - self.padding[0] as isize;
                    if iy < 0 || iy >= h {
                        continue;
                    }
                    for kx in 0..kw {
                        let ix = (x * self.strides[1] + kx) as isize - self.padding[1] as isize;
                        if ix < 0 || ix >= w {
                            continue;
                        }
                        acc = acc + input[(n, c, iy as usize, ix as usize)] * kernel[(o, c, ky, kx)];
                    }
                }
            }
            if let Some(b) = &bias {
                acc = acc + b[o];
            }
            acc
        });
        Ok(output.into_dyn().into())
    }
}

impl Op for Conv {
    fn name(&self) -> Cow<'_, str> {
        "Conv".into()
    }

    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![format!("strides: {:?} padding: {:?}", self.strides, self.padding)])
    }
}

impl EvalOp for Conv {
    fn eval(&self, inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        ensure!(inputs.len() == 2 || inputs.len() == 3, "Conv expects 2 or 3 inputs");
        let dt = inputs[0].datum_type();
        let bias = inputs.get(2).map(|b| &**b);
        let output = dispatch_floatlike!(Self::eval_t(dt)(self, &inputs[0], &inputs[1], bias))?;
        Ok(tvec!(output.into_arc_tensor()))
    }
}

impl TypedOp for Conv {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(inputs.len() == 2 || inputs.len() == 3, "Conv expects 2 or 3 inputs");
        let dt = inputs[0].datum_type;
        ensure!(dt.is_float(), "Conv is defined on floats, got {:?}", dt);
        ensure!(
            inputs.iter().all(|i| i.datum_type == dt),
            "Conv inputs must share a datum type: {:?}",
            inputs
        );
        let shape = self.output_shape(&inputs[0].shape, &inputs[1].shape)?;
        if let Some(bias) = inputs.get(2) {
            ensure!(
                bias.shape[..] == [shape[1]],
                "Bias shape {:?} does not match {} output channels",
                bias.shape,
                shape[1]
            );
        }
        Ok(tvec!(TypedFact::dt_shape(dt, &shape)))
    }

    fn decompose(
        &self,
        target: &mut TypedModel,
        prefix: &str,
        inputs: &[OutletId],
    ) -> DiffResult<Option<TVec<OutletId>>> {
        if inputs.len() != 3 {
            return Ok(None);
        }
        let conv = target.wire_node(prefix, self.clone(), &inputs[0..2])?;
        let bias = super::wire_reshape_as_channel(target, prefix, inputs[2], 4)?;
        target.wire_node(format!("{prefix}.bias"), binary::add(), &[conv[0], bias]).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_shape_with_padding_and_stride() -> DiffResult<()> {
        let conv = Conv::new([2, 2], [1, 1]);
        assert_eq!(conv.output_shape(&[1, 3, 8, 8], &[4, 3, 3, 3])?, tvec!(1usize, 4, 4, 4));
        assert!(conv.output_shape(&[1, 2, 8, 8], &[4, 3, 3, 3]).is_err());
        Ok(())
    }

    #[test]
    fn box_filter() -> DiffResult<()> {
        let input = Tensor::from_shape(&[1, 1, 3, 3], &[1f32, 2., 3., 4., 5., 6., 7., 8., 9.])?;
        let kernel = Tensor::from_shape(&[1, 1, 2, 2], &[1f32; 4])?;
        let out = Conv::default().eval(tvec!(input.into_arc_tensor(), kernel.into_arc_tensor()))?;
        assert_eq!(*out[0], Tensor::from_shape(&[1, 1, 2, 2], &[12f32, 16., 24., 28.])?);
        Ok(())
    }

    #[test]
    fn padding_and_bias() -> DiffResult<()> {
        let input = Tensor::from_shape(&[1, 1, 1, 1], &[2f32])?;
        let kernel = Tensor::from_shape(&[2, 1, 1, 1], &[1f32, -1.])?;
        let bias = tensor1(&[0.5f32, 1.]);
        let conv = Conv::new([1, 1], [1, 1]);
        let out = conv.eval(tvec!(
            input.into_arc_tensor(),
            kernel.into_arc_tensor(),
            bias.into_arc_tensor()
        ))?;
        let expected = Tensor::from_shape(
            &[1, 2, 3, 3],
            &[0.5f32, 0.5, 0.5, 0.5, 2.5, 0.5, 0.5, 0.5, 0.5, 1., 1., 1., 1., -1., 1., 1., 1., 1.],
        )?;
        assert_eq!(*out[0], expected);
        Ok(())
    }
}
