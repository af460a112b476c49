use crate::internal::*;
use crate::model::translator::mapped_inputs;

/// Replace composite ops by their primitive equivalent.
#[derive(Clone, Debug)]
pub struct Decompose;

impl Translate for Decompose {
    fn translate_node(
        &self,
        _source: &TypedModel,
        node: &TypedNode,
        target: &mut TypedModel,
        mapping: &HashMap<OutletId, OutletId>,
    ) -> DiffResult<TVec<OutletId>> {
        let inputs = mapped_inputs(node, mapping)?;
        if let Some(outlets) = node.op.decompose(target, &node.name, &inputs)? {
            trace!("Decomposed {node}");
            Ok(outlets)
        } else {
            target.wire_node(&node.name, node.op.clone(), &inputs)
        }
    }
}
