//! `Tensor` is the main data container for stagediff
use crate::datum::{Datum, DatumType};
use crate::DiffResult;
use half::f16;
use itertools::Itertools;
use ndarray::prelude::*;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

pub mod litteral;

#[doc(hidden)]
#[derive(Clone, PartialEq)]
pub enum Storage {
    Bool(ArrayD<bool>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F16(ArrayD<f16>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

/// A dynamically typed n-dimensional array.
///
/// Two tensors are equal when they have the same datum type, the same
/// shape and the same elements.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    storage: Storage,
}

impl Tensor {
    /// Create a tensor from a shape and a slice of elements in row-major order.
    pub fn from_shape<T: Datum>(shape: &[usize], data: &[T]) -> DiffResult<Tensor> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data.to_vec()).map_err(|e| {
            anyhow::format_err!("Can not build a {shape:?} tensor from {} elements: {e}", data.len())
        })?;
        Ok(array.into())
    }

    pub fn datum_type(&self) -> DatumType {
        match &self.storage {
            Storage::Bool(_) => DatumType::Bool,
            Storage::U8(_) => DatumType::U8,
            Storage::U16(_) => DatumType::U16,
            Storage::U32(_) => DatumType::U32,
            Storage::U64(_) => DatumType::U64,
            Storage::I8(_) => DatumType::I8,
            Storage::I16(_) => DatumType::I16,
            Storage::I32(_) => DatumType::I32,
            Storage::I64(_) => DatumType::I64,
            Storage::F16(_) => DatumType::F16,
            Storage::F32(_) => DatumType::F32,
            Storage::F64(_) => DatumType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_storage!(&self.storage, a => a.shape())
    }

    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        each_storage!(&self.storage, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_for_access<D: Datum>(&self) -> DiffResult<()> {
        if self.datum_type() != D::datum_type() {
            anyhow::bail!(
                "Tensor datum type error: tensor is {:?}, accessed as {:?}",
                self.datum_type(),
                D::datum_type(),
            );
        }
        Ok(())
    }

    /// Transform the data as a `ndarray::Array`.
    pub fn to_array_view<D: Datum>(&self) -> DiffResult<ArrayViewD<'_, D>> {
        self.check_for_access::<D>()?;
        D::storage_ref(&self.storage)
            .map(|a| a.view())
            .ok_or_else(|| anyhow::format_err!("Storage does not match {:?}", D::datum_type()))
    }

    /// Access the elements as a row-major slice.
    pub fn as_slice<D: Datum>(&self) -> DiffResult<&[D]> {
        self.check_for_access::<D>()?;
        D::storage_ref(&self.storage)
            .and_then(|a| a.as_slice())
            .ok_or_else(|| anyhow::format_err!("Tensor is not contiguous"))
    }

    /// Access the single element of a rank-0 tensor.
    pub fn to_scalar<D: Datum>(&self) -> DiffResult<&D> {
        self.check_for_access::<D>()?;
        if self.len() != 1 {
            anyhow::bail!("to_scalar called on a tensor of shape {:?}", self.shape());
        }
        D::storage_ref(&self.storage)
            .and_then(|a| a.iter().next())
            .ok_or_else(|| anyhow::format_err!("Empty tensor"))
    }

    /// Reshape, keeping row-major element order.
    pub fn into_shape(self, shape: &[usize]) -> DiffResult<Tensor> {
        if shape.iter().product::<usize>() != self.len() {
            anyhow::bail!("Can not reshape {:?} to {:?}", self.shape(), shape);
        }
        let storage = map_storage!(self.storage, a => {
            let a = if a.is_standard_layout() { a } else { a.as_standard_layout().into_owned() };
            a.into_shape_with_order(IxDyn(shape))?
        });
        Ok(Tensor { storage })
    }

    /// Every element converted to f64. Large 64-bit integers lose precision.
    pub fn to_f64_array(&self) -> ArrayD<f64> {
        match &self.storage {
            Storage::Bool(a) => a.mapv(|x| x as u8 as f64),
            Storage::U8(a) => a.mapv(|x| x as f64),
            Storage::U16(a) => a.mapv(|x| x as f64),
            Storage::U32(a) => a.mapv(|x| x as f64),
            Storage::U64(a) => a.mapv(|x| x as f64),
            Storage::I8(a) => a.mapv(|x| x as f64),
            Storage::I16(a) => a.mapv(|x| x as f64),
            Storage::I32(a) => a.mapv(|x| x as f64),
            Storage::I64(a) => a.mapv(|x| x as f64),
            Storage::F16(a) => a.mapv(|x| x.to_f64()),
            Storage::F32(a) => a.mapv(|x| x as f64),
            Storage::F64(a) => a.clone(),
        }
    }

    pub fn cast_to<D: Datum>(&self) -> DiffResult<Cow<'_, Tensor>> {
        self.cast_to_dt(D::datum_type())
    }

    /// Convert to another datum type, going through f64.
    ///
    /// Floats cast to integers truncate towards zero and saturate.
    pub fn cast_to_dt(&self, dt: DatumType) -> DiffResult<Cow<'_, Tensor>> {
        if self.datum_type() == dt {
            return Ok(Cow::Borrowed(self));
        }
        let f = self.to_f64_array();
        let storage = match dt {
            DatumType::Bool => Storage::Bool(f.mapv(|x| x != 0.0)),
            DatumType::U8 => Storage::U8(f.mapv(|x| x as u8)),
            DatumType::U16 => Storage::U16(f.mapv(|x| x as u16)),
            DatumType::U32 => Storage::U32(f.mapv(|x| x as u32)),
            DatumType::U64 => Storage::U64(f.mapv(|x| x as u64)),
            DatumType::I8 => Storage::I8(f.mapv(|x| x as i8)),
            DatumType::I16 => Storage::I16(f.mapv(|x| x as i16)),
            DatumType::I32 => Storage::I32(f.mapv(|x| x as i32)),
            DatumType::I64 => Storage::I64(f.mapv(|x| x as i64)),
            DatumType::F16 => Storage::F16(f.mapv(f16::from_f64)),
            DatumType::F32 => Storage::F32(f.mapv(|x| x as f32)),
            DatumType::F64 => Storage::F64(f),
        };
        Ok(Cow::Owned(Tensor { storage }))
    }

    /// Short human readable dump of the content, at most `max` elements.
    pub fn dump(&self, max: usize) -> String {
        let content = each_storage!(&self.storage, a => a.iter().take(max).join(", "));
        let ellipsis = if self.len() > max { ", ..." } else { "" };
        format!("{},{:?} {}{}", self.shape().iter().join(","), self.datum_type(), content, ellipsis)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dump(12))
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dump(12))
    }
}

impl<D: Dimension, T: Datum> From<Array<T, D>> for Tensor {
    fn from(it: Array<T, D>) -> Tensor {
        Tensor { storage: T::into_storage(it.into_dyn()) }
    }
}

/// Convenient conversion to Tensor.
pub trait IntoTensor: Sized {
    fn into_tensor(self) -> Tensor;
}

/// Convenient conversion to Arc<Tensor>.
pub trait IntoArcTensor: Sized {
    fn into_arc_tensor(self) -> Arc<Tensor>;
}

impl<T: Into<Tensor>> IntoTensor for T {
    fn into_tensor(self) -> Tensor {
        self.into()
    }
}

impl IntoArcTensor for Tensor {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self)
    }
}

impl<D: Dimension, T: Datum> IntoArcTensor for Array<T, D> {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        Arc::new(self.into())
    }
}

impl IntoTensor for Arc<Tensor> {
    fn into_tensor(self) -> Tensor {
        Arc::try_unwrap(self).unwrap_or_else(|t| (*t).clone())
    }
}

impl IntoArcTensor for Arc<Tensor> {
    fn into_arc_tensor(self) -> Arc<Tensor> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::litteral::*;
    use super::*;

    #[test]
    fn reshape_keeps_order() {
        let t = tensor1(&[1i32, 2, 3, 4, 5, 6]).into_shape(&[2, 3]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.to_array_view::<i32>().unwrap()[[1, 0]], 4);
        assert!(tensor1(&[1i32, 2, 3]).into_shape(&[2, 2]).is_err());
    }

    #[test]
    fn reshape_transposed_view() {
        let a = ndarray::arr2(&[[1f32, 2.], [3., 4.]]).reversed_axes();
        let t: Tensor = a.into();
        let t = t.into_shape(&[4]).unwrap();
        assert_eq!(t.as_slice::<f32>().unwrap(), &[1., 3., 2., 4.]);
    }

    #[test]
    fn access_with_wrong_type_fails() {
        let t = tensor1(&[1f32, 2.]);
        assert!(t.to_array_view::<f64>().is_err());
        assert!(t.to_array_view::<f32>().is_ok());
    }

    #[test]
    fn cast_f32_to_f16_and_back() {
        let t = tensor1(&[0.5f32, 1.0, -2.0]);
        let h = t.cast_to::<f16>().unwrap();
        assert_eq!(h.datum_type(), DatumType::F16);
        let back = h.cast_to::<f32>().unwrap();
        assert_eq!(&*back, &t);
    }

    #[test]
    fn equality_requires_same_datum_type() {
        assert_ne!(tensor1(&[1i32, 2]), tensor1(&[1i64, 2]));
        assert_eq!(tensor1(&[1i32, 2]), tensor1(&[1i32, 2]));
    }

    #[test]
    fn scalar_access() {
        assert_eq!(*tensor0(3.5f64).to_scalar::<f64>().unwrap(), 3.5);
        assert!(tensor1(&[1f32, 2.]).to_scalar::<f32>().is_err());
    }

    #[test]
    fn dump_is_bounded() {
        let t = tensor1(&(0..20).collect::<Vec<i32>>());
        assert_eq!(t.dump(3), "20,I32 0, 1, 2, ...");
    }
}
