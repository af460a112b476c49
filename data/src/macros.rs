#[macro_export]
macro_rules! tvec {
    // count helper: transform any expression into 1
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::TVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ tvec!(@one $x))*;
        #[allow(unused_mut)]
        let mut vec = $crate::TVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::TVec::from_vec(vec![$($x,)*])
        }
    });
}

#[macro_export]
macro_rules! dispatch_datum {
    ($($path:ident)::* ($dt:expr) ($($args:expr),*)) => { {
        use $crate::prelude::DatumType;
        match $dt {
            DatumType::Bool => $($path)::*::<bool>($($args),*),
            DatumType::U8   => $($path)::*::<u8>($($args),*),
            DatumType::U16  => $($path)::*::<u16>($($args),*),
            DatumType::U32  => $($path)::*::<u32>($($args),*),
            DatumType::U64  => $($path)::*::<u64>($($args),*),
            DatumType::I8   => $($path)::*::<i8>($($args),*),
            DatumType::I16  => $($path)::*::<i16>($($args),*),
            DatumType::I32  => $($path)::*::<i32>($($args),*),
            DatumType::I64  => $($path)::*::<i64>($($args),*),
            DatumType::F16  => $($path)::*::<$crate::prelude::f16>($($args),*),
            DatumType::F32  => $($path)::*::<f32>($($args),*),
            DatumType::F64  => $($path)::*::<f64>($($args),*),
        }
    } }
}

#[macro_export]
macro_rules! dispatch_numbers {
    ($($path:ident)::* ($dt:expr) ($($args:expr),*)) => { {
        use $crate::prelude::DatumType;
        match $dt {
            DatumType::U8   => $($path)::*::<u8>($($args),*),
            DatumType::U16  => $($path)::*::<u16>($($args),*),
            DatumType::U32  => $($path)::*::<u32>($($args),*),
            DatumType::U64  => $($path)::*::<u64>($($args),*),
            DatumType::I8   => $($path)::*::<i8>($($args),*),
            DatumType::I16  => $($path)::*::<i16>($($args),*),
            DatumType::I32  => $($path)::*::<i32>($($args),*),
            DatumType::I64  => $($path)::*::<i64>($($args),*),
            DatumType::F16  => $($path)::*::<$crate::prelude::f16>($($args),*),
            DatumType::F32  => $($path)::*::<f32>($($args),*),
            DatumType::F64  => $($path)::*::<f64>($($args),*),
            _ => $crate::internal::bail!("{:?} is not a number", $dt)
        }
    } }
}

#[macro_export]
macro_rules! dispatch_floatlike {
    ($($path:ident)::* ($dt:expr) ($($args:expr),*)) => { {
        use $crate::prelude::DatumType;
        match $dt {
            DatumType::F16  => $($path)::*::<$crate::prelude::f16>($($args),*),
            DatumType::F32  => $($path)::*::<f32>($($args),*),
            DatumType::F64  => $($path)::*::<f64>($($args),*),
            _ => $crate::internal::bail!("{:?} is not float-like", $dt)
        }
    } }
}

// Apply the same expression to whichever array a storage holds.
macro_rules! each_storage {
    ($storage:expr, $a:ident => $body:expr) => {
        match $storage {
            Storage::Bool($a) => $body,
            Storage::U8($a) => $body,
            Storage::U16($a) => $body,
            Storage::U32($a) => $body,
            Storage::U64($a) => $body,
            Storage::I8($a) => $body,
            Storage::I16($a) => $body,
            Storage::I32($a) => $body,
            Storage::I64($a) => $body,
            Storage::F16($a) => $body,
            Storage::F32($a) => $body,
            Storage::F64($a) => $body,
        }
    };
}

// Same as `each_storage`, rewrapping the result in the original variant.
macro_rules! map_storage {
    ($storage:expr, $a:ident => $body:expr) => {
        match $storage {
            Storage::Bool($a) => Storage::Bool($body),
            Storage::U8($a) => Storage::U8($body),
            Storage::U16($a) => Storage::U16($body),
            Storage::U32($a) => Storage::U32($body),
            Storage::U64($a) => Storage::U64($body),
            Storage::I8($a) => Storage::I8($body),
            Storage::I16($a) => Storage::I16($body),
            Storage::I32($a) => Storage::I32($body),
            Storage::I64($a) => Storage::I64($body),
            Storage::F16($a) => Storage::F16($body),
            Storage::F32($a) => Storage::F32($body),
            Storage::F64($a) => Storage::F64($body),
        }
    };
}
