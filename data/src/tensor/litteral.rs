use super::Tensor;
use crate::datum::Datum;
use ndarray::*;
use std::sync::Arc;

pub fn arr4<A, const N: usize, const M: usize, const T: usize, const U: usize>(
    xs: &[[[[A; U]; T]; M]; N],
) -> Array4<A>
where
    A: Clone,
{
    Array4::from_shape_fn((N, M, T, U), |(n, m, t, u)| xs[n][m][t][u].clone())
}

pub fn tensor0<A: Datum>(x: A) -> Tensor {
    Tensor::from(arr0(x))
}

pub fn tensor1<A: Datum>(xs: &[A]) -> Tensor {
    Tensor::from(arr1(xs))
}

pub fn tensor2<A: Datum, const N: usize>(xs: &[[A; N]]) -> Tensor {
    Tensor::from(arr2(xs))
}

pub fn tensor4<A: Datum, const N: usize, const M: usize, const T: usize, const U: usize>(
    xs: &[[[[A; U]; T]; M]; N],
) -> Tensor {
    Tensor::from(arr4(xs))
}

pub fn rctensor0<A: Datum>(x: A) -> Arc<Tensor> {
    Arc::new(tensor0(x))
}

pub fn rctensor1<A: Datum>(xs: &[A]) -> Arc<Tensor> {
    Arc::new(tensor1(xs))
}
