use crate::internal::*;

/// Model input placeholder. The plan feeds it, it never evaluates.
#[derive(Debug, Clone, new)]
pub struct TypedSource {
    pub fact: TypedFact,
}

impl Op for TypedSource {
    fn name(&self) -> Cow<'_, str> {
        "Source".into()
    }
}

impl EvalOp for TypedSource {
    fn eval(&self, _inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        bail!("Source is fed by the plan, not evaluated")
    }
}

impl TypedOp for TypedSource {
    as_op!();

    fn output_facts(&self, _inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        Ok(tvec!(self.fact.clone()))
    }
}
