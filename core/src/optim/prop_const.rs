use crate::internal::*;
use crate::model::translator::mapped_inputs;
use crate::ops::konst::Const;

/// Evaluate nodes whose inputs are all known at build time, and replace
/// them by constants.
#[derive(Clone, Debug)]
pub struct PropConst;

impl Translate for PropConst {
    fn translate_node(
        &self,
        _source: &TypedModel,
        node: &TypedNode,
        target: &mut TypedModel,
        mapping: &HashMap<OutletId, OutletId>,
    ) -> DiffResult<TVec<OutletId>> {
        let inputs = mapped_inputs(node, mapping)?;
        if !node.op_is::<Const>() && !inputs.is_empty() {
            let konsts: Option<TVec<TValue>> = inputs
                .iter()
                .map(|i| target.outlet_fact(*i).map(|f| f.konst.clone()))
                .collect::<DiffResult<TVec<_>>>()?
                .into_iter()
                .collect();
            if let Some(konsts) = konsts {
                trace!("Folding {node}");
                let outputs = node.op.eval(konsts).context("Eager eval during optimisation")?;
                return outputs
                    .into_iter()
                    .enumerate()
                    .map(|(ix, output)| {
                        let name =
                            if ix == 0 { node.name.clone() } else { format!("{}.{}", node.name, ix) };
                        target.add_const(name, output)
                    })
                    .collect();
            }
        }
        target.wire_node(&node.name, node.op.clone(), &inputs)
    }
}
