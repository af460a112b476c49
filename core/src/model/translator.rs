use crate::internal::*;
use crate::ops::source::TypedSource;
use std::fmt;

/// Rebuild a model node by node into a new one.
///
/// Sources are carried over as they are, keeping the input interface in
/// order; every other node goes through `translate_node`, which may wire
/// any number of nodes in the target and returns the outlets standing for
/// the original node outputs.
pub trait Translate: fmt::Debug {
    fn translate_node(
        &self,
        source: &TypedModel,
        node: &TypedNode,
        target: &mut TypedModel,
        mapping: &HashMap<OutletId, OutletId>,
    ) -> DiffResult<TVec<OutletId>>;

    fn translate_model(&self, source: &TypedModel) -> DiffResult<TypedModel> {
        Ok(self.translate_model_with_mappings(source)?.0)
    }

    fn translate_model_with_mappings(
        &self,
        source: &TypedModel,
    ) -> DiffResult<(TypedModel, HashMap<OutletId, OutletId>)> {
        let mut target = TypedModel::default();
        let mut mapping = HashMap::new();
        for node in source.nodes() {
            let outlets = if let Some(s) = node.op_as::<TypedSource>() {
                tvec!(target.add_source(&node.name, s.fact.clone())?)
            } else {
                self.translate_node(source, node, &mut target, &mapping)
                    .with_context(|| format!("Translating node {node} {self:?}"))?
            };
            for (ix, outlet) in outlets.into_iter().enumerate() {
                mapping.insert(OutletId::new(node.id, ix), outlet);
            }
        }
        // maintaining order of i/o interface
        target.inputs = source.input_outlets().iter().map(|i| mapping[i]).collect();
        target.outputs = source
            .output_outlets()
            .iter()
            .map(|o| {
                mapping.get(o).copied().with_context(|| format!("Output {o:?} was not translated"))
            })
            .collect::<DiffResult<_>>()?;
        Ok((target, mapping))
    }
}

/// Mapped inputs of a node.
pub fn mapped_inputs(
    node: &TypedNode,
    mapping: &HashMap<OutletId, OutletId>,
) -> DiffResult<TVec<OutletId>> {
    node.inputs
        .iter()
        .map(|i| mapping.get(i).copied().with_context(|| format!("{i:?} was not translated")))
        .collect()
}
