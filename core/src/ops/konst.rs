use crate::internal::*;

#[derive(Debug, Clone, new, PartialEq)]
pub struct Const(pub Arc<Tensor>);

impl Op for Const {
    fn name(&self) -> Cow<'_, str> {
        "Const".into()
    }

    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![self.0.dump(8)])
    }
}

impl EvalOp for Const {
    fn eval(&self, _inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        Ok(tvec![self.0.clone()])
    }
}

impl TypedOp for Const {
    as_op!();

    fn output_facts(&self, _inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        Ok(tvec!(Arc::clone(&self.0).into()))
    }
}
