//! Element types a `Tensor` can hold.
use crate::tensor::Storage;
use half::f16;
use ndarray::ArrayD;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum DatumType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl DatumType {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, DatumType::U8 | DatumType::U16 | DatumType::U32 | DatumType::U64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DatumType::I8 | DatumType::I16 | DatumType::I32 | DatumType::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DatumType::F16 | DatumType::F32 | DatumType::F64)
    }

    /// Integer kinds, signed or not. Bool is not an integer.
    pub fn is_integer(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn all() -> &'static [DatumType] {
        use DatumType::*;
        &[Bool, U8, U16, U32, U64, I8, I16, I32, I64, F16, F32, F64]
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DatumType::Bool => "bool",
            DatumType::U8 => "u8",
            DatumType::U16 => "u16",
            DatumType::U32 => "u32",
            DatumType::U64 => "u64",
            DatumType::I8 => "i8",
            DatumType::I16 => "i16",
            DatumType::I32 => "i32",
            DatumType::I64 => "i64",
            DatumType::F16 => "f16",
            DatumType::F32 => "f32",
            DatumType::F64 => "f64",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DatumType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<DatumType> {
        DatumType::all()
            .iter()
            .find(|dt| dt.to_string() == s.to_lowercase())
            .copied()
            .ok_or_else(|| anyhow::format_err!("Unknown datum type {s}"))
    }
}

pub trait Datum:
    Clone + Copy + Send + Sync + fmt::Debug + fmt::Display + PartialEq + Default + 'static
{
    fn name() -> &'static str;
    fn datum_type() -> DatumType;

    #[doc(hidden)]
    fn into_storage(array: ArrayD<Self>) -> Storage;
    #[doc(hidden)]
    fn storage_ref(storage: &Storage) -> Option<&ArrayD<Self>>;
}

macro_rules! datum {
    ($t:ty, $v:ident) => {
        impl Datum for $t {
            fn name() -> &'static str {
                stringify!($t)
            }

            fn datum_type() -> DatumType {
                DatumType::$v
            }

            fn into_storage(array: ArrayD<Self>) -> Storage {
                Storage::$v(array)
            }

            fn storage_ref(storage: &Storage) -> Option<&ArrayD<Self>> {
                if let Storage::$v(a) = storage { Some(a) } else { None }
            }
        }
    };
}

datum!(bool, Bool);
datum!(u8, U8);
datum!(u16, U16);
datum!(u32, U32);
datum!(u64, U64);
datum!(i8, I8);
datum!(i16, I16);
datum!(i32, I32);
datum!(i64, I64);
datum!(f16, F16);
datum!(f32, F32);
datum!(f64, F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_kinds() {
        assert!(DatumType::I32.is_integer());
        assert!(DatumType::U8.is_integer());
        assert!(!DatumType::Bool.is_integer());
        assert!(!DatumType::F16.is_integer());
        assert!(DatumType::F16.is_float());
    }

    #[test]
    fn parse_roundtrips_display() {
        for dt in DatumType::all() {
            assert_eq!(&dt.to_string().parse::<DatumType>().unwrap(), dt);
        }
        assert!("f128".parse::<DatumType>().is_err());
    }
}
