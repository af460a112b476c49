#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used about everywhere in stagediff, for node inputs and outputs, or
/// tensor dimensions.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub type DiffResult<T> = anyhow::Result<T>;
pub type DiffError = anyhow::Error;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::tensor::litteral::*;
    pub use crate::tensor::{IntoArcTensor, IntoTensor, Tensor};
    pub use crate::tvec;
    pub use crate::value::{NumericArrayView, Scalar, Value};
    pub use crate::TVec;
    pub use crate::{dispatch_datum, dispatch_floatlike, dispatch_numbers};
    pub use crate::{DiffError, DiffResult};
    pub use half::f16;
}

pub mod internal {
    pub use crate::prelude::*;
    pub use anyhow::{bail, ensure, format_err, Context as DiffErrorContext};
    pub use ndarray as stagediff_ndarray;
    pub use smallvec as stagediff_smallvec;
    pub use std::borrow::Cow;
    pub use std::collections::HashMap;
    pub use std::sync::Arc;
}

pub use anyhow;
pub use half;
pub use ndarray;
pub use num_traits;

mod datum;
mod tensor;
mod value;
