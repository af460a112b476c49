use infra::TestSuite;
use stagediff_core::internal::*;

pub mod activation;
pub mod conv_bn;
pub mod reshape_concat;

pub fn suite() -> DiffResult<TestSuite> {
    let mut suite: TestSuite = Default::default();
    suite.add_suite("activation", activation::suite()?)?;
    suite.add_suite("conv_bn", conv_bn::suite()?)?;
    suite.add_suite("reshape_concat", reshape_concat::suite()?)?;
    Ok(suite)
}

/// Per-channel constant of the given type.
pub(crate) fn channel_const(
    model: &mut TypedModel,
    name: impl Into<String>,
    dt: DatumType,
    values: &[f32],
) -> DiffResult<OutletId> {
    let t = tensor1(values).cast_to_dt(dt)?.into_owned();
    model.add_const(name, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids() -> DiffResult<()> {
        let suite = suite()?;
        let ids = suite.tests().into_iter().map(|(id, _, _)| id).collect::<Vec<_>>();
        assert!(ids.contains(&"conv_bn::conv_bn_relu".to_string()));
        assert!(ids.contains(&"activation::sigmoid_f16".to_string()));
        assert!(ids.iter().all(|id| id.matches("::").count() == 1));
        Ok(())
    }
}
