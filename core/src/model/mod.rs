//! ## Models and their lifecycle
//!
//! A `TypedModel` is built by wiring ops (`add_source`, `add_const`,
//! `wire_node`). It can then be lowered with `into_decomposed` (primitive
//! ops only, constants folded) and `into_fused` (element-wise chains merged
//! into single kernels), and finally turned into a `SimplePlan` to run.
mod fact;
mod graph;
mod node;
pub mod translator;

pub use self::fact::TypedFact;
pub use self::graph::TypedModel;
pub use self::node::{InletId, OutletId, TypedNode};
pub use self::translator::Translate;
