use crate::internal::*;

/// Build the plan for the compiled path of a model.
///
/// Decomposition runs under `prim_all`, fusion when both the caller and the
/// flags ask for the compiler, and the plan checks inferred facts under
/// `check_infer_symbolic`.
pub fn compile(model: &TypedModel, flags: &Flags, use_compiler: bool) -> DiffResult<SimplePlan> {
    let mut model = model.clone();
    if flags.prim_all {
        model = model.into_decomposed()?;
    }
    if use_compiler && flags.use_compiler {
        model = model.into_fused(flags.enable_fusion_fallback)?;
    }
    debug!("Compiled with {flags:?} (use_compiler: {use_compiler}):\n{model}");
    Ok(SimplePlan::new(model)?.with_fact_check(flags.check_infer_symbolic))
}

/// Plan for the raw model, as built.
pub fn eager(model: &TypedModel) -> DiffResult<SimplePlan> {
    SimplePlan::new(model.clone())
}
