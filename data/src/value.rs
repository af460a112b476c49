//! Outputs of a subgraph run, as handed to comparators.
use crate::datum::DatumType;
use crate::tensor::Tensor;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Capability of exposing a typed numeric array.
///
/// Values that implement it are compared element-wise; values that do not
/// fall back to plain equality.
pub trait NumericArrayView {
    fn dtype(&self) -> DatumType;
    fn to_array(&self) -> Cow<'_, Tensor>;
}

impl NumericArrayView for Tensor {
    fn dtype(&self) -> DatumType {
        self.datum_type()
    }

    fn to_array(&self) -> Cow<'_, Tensor> {
        Cow::Borrowed(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Tensor(Arc<Tensor>),
    Scalar(Scalar),
    List(Vec<Value>),
}

impl Value {
    pub fn as_numeric(&self) -> Option<&dyn NumericArrayView> {
        match self {
            Value::Tensor(t) => Some(&**t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Tensor(t) => write!(f, "{t}"),
            Value::Scalar(s) => write!(f, "{s}"),
            Value::List(l) => {
                write!(f, "[")?;
                for (ix, v) in l.iter().enumerate() {
                    if ix > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Value {
        Value::Tensor(Arc::new(t))
    }
}

impl From<Arc<Tensor>> for Value {
    fn from(t: Arc<Tensor>) -> Value {
        Value::Tensor(t)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Value {
        Value::Scalar(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Value {
        Value::List(l)
    }
}
