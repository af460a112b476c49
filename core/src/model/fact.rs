use crate::internal::*;

/// Fully determined tensor information: datum type, shape, and the value
/// when it is known at build time.
#[derive(Clone, PartialEq)]
pub struct TypedFact {
    pub datum_type: DatumType,
    pub shape: TVec<usize>,
    pub konst: Option<Arc<Tensor>>,
}

impl TypedFact {
    pub fn dt_shape(datum_type: DatumType, shape: &[usize]) -> TypedFact {
        TypedFact { datum_type, shape: shape.into(), konst: None }
    }

    pub fn shape<T: Datum>(shape: &[usize]) -> TypedFact {
        Self::dt_shape(T::datum_type(), shape)
    }

    pub fn shape_and_dt_of(t: &Tensor) -> TypedFact {
        Self::dt_shape(t.datum_type(), t.shape())
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn volume(&self) -> usize {
        self.shape.iter().product()
    }

    /// Same datum type and shape, ignoring the constant value.
    pub fn same_type_and_shape(&self, other: &TypedFact) -> bool {
        self.datum_type == other.datum_type && self.shape == other.shape
    }

    /// Check a runtime value against this fact.
    pub fn matches(&self, t: &Tensor) -> bool {
        self.datum_type == t.datum_type() && &*self.shape == t.shape()
    }

    pub fn without_value(&self) -> TypedFact {
        TypedFact { konst: None, ..self.clone() }
    }
}

impl From<Arc<Tensor>> for TypedFact {
    fn from(t: Arc<Tensor>) -> TypedFact {
        TypedFact { datum_type: t.datum_type(), shape: t.shape().into(), konst: Some(t) }
    }
}

impl From<Tensor> for TypedFact {
    fn from(t: Tensor) -> TypedFact {
        t.into_arc_tensor().into()
    }
}

impl fmt::Debug for TypedFact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for d in &self.shape {
            write!(f, "{d},")?;
        }
        write!(f, "{:?}", self.datum_type)?;
        if let Some(k) = &self.konst {
            write!(f, " = {k:?}")?;
        }
        Ok(())
    }
}
