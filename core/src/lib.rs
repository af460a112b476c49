//! # stagediff core
//!
//! A small typed graph framework, playing the compiler under test for the
//! stagediff harness.
//!
//! ## Example
//!
//! ```
//! # use stagediff_core::prelude::*;
//! # use stagediff_core::ops::binary;
//! # fn main() -> DiffResult<()> {
//! let mut model = TypedModel::default();
//! let x = model.add_source("x", TypedFact::shape::<f32>(&[3]))?;
//! let three = model.add_const("three", tensor0(3f32))?;
//! let add = model.wire_node("add", binary::add(), &[x, three])?;
//! model.set_output_outlets(&add)?;
//!
//! // the same model, through the whole compilation pipeline
//! let plan = compile(&model, &Flags { use_compiler: true, ..Flags::default() }, true)?;
//! let outputs = plan.run(tvec!(rctensor1(&[1.0f32, 2.5, 5.0])))?;
//! assert_eq!(*outputs[0], tensor1(&[4.0f32, 5.5, 8.0]));
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate log;

#[macro_use]
pub mod macros;

pub mod broadcast;
pub mod flags;
pub mod model;
pub mod ops;
pub mod optim;
pub mod pipeline;
pub mod plan;

pub use stagediff_data;

pub mod prelude {
    pub use crate::flags::Flags;
    pub use crate::model::{OutletId, TypedFact, TypedModel, TypedNode};
    pub use crate::pipeline::{compile, eager};
    pub use crate::plan::SimplePlan;
    pub use stagediff_data::prelude::*;
}

pub mod internal {
    pub use crate::model::*;
    pub use crate::ops::{EvalOp, ElementWiseKind, Op, TValue, TypedOp};
    pub use crate::prelude::*;
    pub use stagediff_data::internal::*;
    pub use std::fmt;
}

#[cfg(test)]
fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("STAGEDIFF_LOG").try_init();
}
