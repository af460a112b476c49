use infra::{InputSpec, SubgraphCase, TestSuite};
use stagediff_core::internal::*;
use stagediff_core::ops::array::{Concat, Reshape};
use stagediff_core::ops::binary::add;
use stagediff_core::ops::element_wise::relu;

fn flatten_concat(name: &str, dt: DatumType) -> SubgraphCase {
    SubgraphCase::new(name)
        .with_input(InputSpec::uniform(dt, &[2, 3, 4], -100.0, 100.0))
        .with_input(InputSpec::uniform(dt, &[2, 3, 4], -100.0, 100.0))
        .with_net(|model, inputs| {
            let sum = model.wire_node("sum", add(), inputs)?;
            let flat = model.wire_node("flat", Reshape::new(tvec!(2, -1)), &sum)?;
            let other = model.wire_node("other", Reshape::new(tvec!(2, 12)), &[inputs[1]])?;
            model.wire_node("concat", Concat::new(1), &[flat[0], other[0]])
        })
}

fn fixed_values() -> DiffResult<SubgraphCase> {
    let values = InputSpec::reshaped(tensor1(&[-3f32, -1., 0., 1., 2., 5.]), &[2, 3])?;
    Ok(SubgraphCase::new("fixed_values")
        .with_input(values)
        .with_input(InputSpec::uniform(DatumType::F32, &[3], 0.0, 1.0))
        .with_net(|model, inputs| {
            let x = model.wire_node("add", add(), inputs)?;
            let x = model.wire_node("relu", relu(), &x)?;
            model.wire_node("concat", Concat::new(-1), &[x[0], inputs[0]])
        }))
}

pub fn suite() -> DiffResult<TestSuite> {
    let mut suite = TestSuite::default();
    suite.add("flatten_concat_f32", flatten_concat("flatten_concat_f32", DatumType::F32))?;
    suite.add("flatten_concat_i32", flatten_concat("flatten_concat_i32", DatumType::I32))?;
    suite.add("fixed_values", fixed_values()?)?;
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_inputs_are_truncated_draws() -> DiffResult<()> {
        let case = flatten_concat("sample", DatumType::I32);
        let data = case.prepare_data()?;
        assert_eq!(data[0].datum_type(), DatumType::I32);
        assert!(data[0].as_slice::<i32>()?.iter().all(|x| (-100..100).contains(x)));
        assert_eq!(case.model()?.output_fact(0)?.shape, tvec!(2, 24));
        Ok(())
    }

    #[test]
    fn same_seed_same_data() -> DiffResult<()> {
        let a = flatten_concat("a", DatumType::F32).prepare_data()?;
        let b = flatten_concat("b", DatumType::F32).prepare_data()?;
        assert_eq!(a, b);
        let c = flatten_concat("c", DatumType::F32).with_seed(7).prepare_data()?;
        assert_ne!(a, c);
        Ok(())
    }
}
