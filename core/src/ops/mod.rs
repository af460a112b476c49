//! Ops
use std::fmt;

use downcast_rs::Downcast;

use crate::internal::*;

pub mod array;
pub mod binary;
pub mod cnn;
pub mod element_wise;
pub mod fused;
pub mod konst;
pub mod nn;
pub mod source;

/// Values flowing between nodes at runtime.
pub type TValue = Arc<Tensor>;

pub trait Op: fmt::Debug + dyn_clone::DynClone + Send + Sync + 'static + Downcast {
    fn name(&self) -> Cow<'_, str>;

    /// Short human readable description of the op parameters.
    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![])
    }
}

dyn_clone::clone_trait_object!(Op);
downcast_rs::impl_downcast!(Op);

pub trait EvalOp {
    fn eval(&self, inputs: TVec<TValue>) -> DiffResult<TVec<TValue>>;
}

/// Element-wise behaviour of an op, as seen by the fusion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementWiseKind {
    Unary(element_wise::UnaryMiniOp),
    Binary(binary::BinMiniOp),
}

pub trait TypedOp:
    Op + EvalOp + fmt::Debug + dyn_clone::DynClone + Send + Sync + 'static + Downcast
{
    /// Reinterpret the TypedOp as an Op.
    fn as_op(&self) -> &dyn Op;

    /// Deduce output facts from input facts.
    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>>;

    /// Wire an equivalent built from primitive ops into `target`.
    ///
    /// Returns None when the op is already primitive.
    #[allow(unused_variables)]
    fn decompose(
        &self,
        target: &mut TypedModel,
        prefix: &str,
        inputs: &[OutletId],
    ) -> DiffResult<Option<TVec<OutletId>>> {
        Ok(None)
    }

    /// Element-wise ops expose their scalar function here so chains of them
    /// can be fused.
    fn as_element_wise(&self) -> Option<ElementWiseKind> {
        None
    }
}

dyn_clone::clone_trait_object!(TypedOp);
downcast_rs::impl_downcast!(TypedOp);

impl<O: TypedOp> From<O> for Box<dyn TypedOp> {
    fn from(it: O) -> Box<dyn TypedOp> {
        Box::new(it)
    }
}

impl AsRef<dyn Op> for dyn TypedOp {
    fn as_ref(&self) -> &dyn Op {
        self.as_op()
    }
}

pub fn check_input_arity(inputs: &[TValue], expected: usize) -> DiffResult<()> {
    if inputs.len() != expected {
        bail!("Wrong input number. Op expects {}, got {}.", expected, inputs.len())
    } else {
        Ok(())
    }
}
