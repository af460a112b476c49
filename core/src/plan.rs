use crate::internal::*;
use crate::ops::source::TypedSource;

/// Evaluation plan for a model: the nodes its outputs depend on, in order.
#[derive(Debug, Clone)]
pub struct SimplePlan {
    model: Arc<TypedModel>,
    order: Vec<usize>,
    check_facts: bool,
}

impl SimplePlan {
    /// This contructor returns a plan that will compute all the model default outputs in one pass.
    pub fn new(model: impl Into<Arc<TypedModel>>) -> DiffResult<SimplePlan> {
        let model = model.into();
        ensure!(!model.output_outlets().is_empty(), "Model has no outputs");
        let mut needed = vec![false; model.nodes().len()];
        let mut todo: Vec<usize> = model.output_outlets().iter().map(|o| o.node).collect();
        while let Some(n) = todo.pop() {
            if needed[n] {
                continue;
            }
            needed[n] = true;
            todo.extend(model.node(n).inputs.iter().map(|i| i.node));
        }
        let order = (0..needed.len()).filter(|n| needed[*n]).collect();
        Ok(SimplePlan { model, order, check_facts: false })
    }

    /// Check every value produced at runtime against the facts inferred when
    /// the model was built.
    pub fn with_fact_check(self, check_facts: bool) -> SimplePlan {
        SimplePlan { check_facts, ..self }
    }

    pub fn model(&self) -> &TypedModel {
        &self.model
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn run(&self, inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        let model = &*self.model;
        ensure!(
            inputs.len() == model.input_outlets().len(),
            "Model expects {} inputs, got {}",
            model.input_outlets().len(),
            inputs.len()
        );
        let mut values: Vec<Option<TVec<TValue>>> = vec![None; model.nodes().len()];
        for (ix, (outlet, input)) in model.input_outlets().iter().zip(inputs).enumerate() {
            let fact = model.outlet_fact(*outlet)?;
            ensure!(
                fact.matches(&input),
                "Input #{} ({}): expected {:?}, got {:?}",
                ix,
                model.node(outlet.node).name,
                fact,
                input
            );
            values[outlet.node] = Some(tvec!(input));
        }
        for &n in &self.order {
            let node = model.node(n);
            if node.op_is::<TypedSource>() {
                ensure!(values[n].is_some(), "{node} was not fed");
                continue;
            }
            let inputs = node
                .inputs
                .iter()
                .map(|o| {
                    values[o.node]
                        .as_ref()
                        .and_then(|v| v.get(o.slot))
                        .cloned()
                        .with_context(|| format!("Missing value for {o:?}, needed by {node}"))
                })
                .collect::<DiffResult<TVec<_>>>()?;
            trace!("Running {node}");
            let outputs = node.op.eval(inputs).with_context(|| format!("Evaluating {node}"))?;
            if self.check_facts {
                ensure!(
                    outputs.len() == node.outputs.len(),
                    "{node}: inferred {} outputs, computed {}",
                    node.outputs.len(),
                    outputs.len()
                );
                for (ix, (fact, value)) in node.outputs.iter().zip(outputs.iter()).enumerate() {
                    ensure!(
                        fact.matches(value),
                        "Inferred and computed output #{} of {} differ: inferred {:?}, got {:?},{:?}",
                        ix,
                        node,
                        fact,
                        value.shape(),
                        value.datum_type()
                    );
                }
            }
            values[n] = Some(outputs);
        }
        model
            .output_outlets()
            .iter()
            .map(|o| {
                values[o.node]
                    .as_ref()
                    .and_then(|v| v.get(o.slot))
                    .cloned()
                    .with_context(|| format!("Output {o:?} was not computed"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::binary;

    #[derive(Debug, Clone)]
    struct Lying;

    impl Op for Lying {
        fn name(&self) -> Cow<'_, str> {
            "Lying".into()
        }
    }

    impl EvalOp for Lying {
        fn eval(&self, _inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
            Ok(tvec!(rctensor1(&[1f32, 2., 3.])))
        }
    }

    impl TypedOp for Lying {
        as_op!();

        fn output_facts(&self, _inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
            Ok(tvec!(TypedFact::shape::<f32>(&[2])))
        }
    }

    fn lying_model() -> DiffResult<TypedModel> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>(&[2]))?;
        let l = model.wire_node("lying", Lying, &[x])?;
        model.set_output_outlets(&l)?;
        Ok(model)
    }

    #[test]
    fn unused_nodes_are_skipped() -> DiffResult<()> {
        let mut model = TypedModel::default();
        let x = model.add_source("x", TypedFact::shape::<f32>(&[2]))?;
        let _unused = model.add_const("unused", tensor0(1f32))?;
        let y = model.wire_node("y", binary::add(), &[x, x])?;
        model.set_output_outlets(&y)?;
        let plan = SimplePlan::new(model)?;
        assert_eq!(plan.order(), &[0, 2]);
        let out = plan.run(tvec!(rctensor1(&[1f32, 2.])))?;
        assert_eq!(*out[0], tensor1(&[2f32, 4.]));
        Ok(())
    }

    #[test]
    fn inputs_are_checked() -> DiffResult<()> {
        let plan = SimplePlan::new(lying_model()?)?;
        assert!(plan.run(tvec!()).is_err());
        assert!(plan.run(tvec!(rctensor1(&[1i32, 2]))).is_err());
        assert!(plan.run(tvec!(rctensor1(&[1f32, 2., 3.]))).is_err());
        Ok(())
    }

    #[test]
    fn fact_check_catches_inference_mismatch() -> DiffResult<()> {
        let plan = SimplePlan::new(lying_model()?)?;
        assert!(plan.run(tvec!(rctensor1(&[1f32, 2.]))).is_ok());
        let plan = plan.with_fact_check(true);
        let err = plan.run(tvec!(rctensor1(&[1f32, 2.]))).unwrap_err();
        assert!(format!("{err:?}").contains("lying"));
        Ok(())
    }
}
