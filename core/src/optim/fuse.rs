use crate::internal::*;
use crate::model::translator::mapped_inputs;
use crate::ops::fused::{FusedElementWise, FusedStep};
use itertools::Itertools;
use std::collections::HashSet;

/// Merge chains of float element-wise nodes into `FusedElementWise` nodes.
///
/// A chain grows from a node to its successor as long as the node output is
/// consumed by exactly that one inlet, is not a model output, and keeps the
/// same type and shape. Chains of a single node are left alone.
#[derive(Clone, Debug)]
pub struct Fuse {
    fallback: bool,
    /// chains, by the id of their last node
    chains: HashMap<usize, Vec<usize>>,
    /// chain members other than the last one
    absorbed: HashSet<usize>,
}

impl Fuse {
    pub fn analyse(model: &TypedModel, fallback: bool) -> Fuse {
        let mut chains = HashMap::new();
        let mut absorbed = HashSet::new();
        for node in model.nodes() {
            if absorbed.contains(&node.id) || !Self::fusable(node) {
                continue;
            }
            let mut chain = vec![node.id];
            while let Some(next) = Self::chain_successor(model, model.node(chain[chain.len() - 1]))
            {
                chain.push(next);
            }
            if chain.len() > 1 {
                debug!("Fusing {}", chain.iter().map(|n| model.node(*n).to_string()).join(", "));
                absorbed.extend(chain[..chain.len() - 1].iter().copied());
                chains.insert(chain[chain.len() - 1], chain);
            }
        }
        Fuse { fallback, chains, absorbed }
    }

    fn fusable(node: &TypedNode) -> bool {
        node.op.as_element_wise().is_some()
            && node.outputs.len() == 1
            && node.outputs[0].datum_type.is_float()
    }

    fn chain_successor(model: &TypedModel, node: &TypedNode) -> Option<usize> {
        let outlet = OutletId::new(node.id, 0);
        if model.output_outlets().contains(&outlet) {
            return None;
        }
        let successors = model.outlet_successors(outlet);
        if successors.len() != 1 {
            return None;
        }
        let next = model.node(successors[0].node);
        if !Self::fusable(next) || !next.outputs[0].same_type_and_shape(&node.outputs[0]) {
            return None;
        }
        Some(next.id)
    }

    /// Steps and source outlets feeding a chain.
    fn chain_steps(
        model: &TypedModel,
        chain: &[usize],
    ) -> DiffResult<(Vec<FusedStep>, TVec<OutletId>)> {
        let mut steps = vec![];
        let mut inputs: TVec<OutletId> = tvec!();
        let first = model.node(chain[0]);
        match first.op.as_element_wise().context("Non element-wise node in chain")? {
            ElementWiseKind::Unary(op) => {
                inputs.push(first.inputs[0]);
                steps.push(FusedStep::Unary(op));
            }
            ElementWiseKind::Binary(op) => {
                inputs.extend(first.inputs.iter().copied());
                steps.push(FusedStep::Binary { op, input: 1, chain_lhs: true });
            }
        }
        for pair in chain.windows(2) {
            let running = OutletId::new(pair[0], 0);
            let node = model.node(pair[1]);
            match node.op.as_element_wise().context("Non element-wise node in chain")? {
                ElementWiseKind::Unary(op) => steps.push(FusedStep::Unary(op)),
                ElementWiseKind::Binary(op) => {
                    let slot = node
                        .inputs
                        .iter()
                        .position(|i| *i == running)
                        .with_context(|| format!("{node} is not fed by its chain"))?;
                    inputs.push(node.inputs[1 - slot]);
                    let input = inputs.len() - 1;
                    steps.push(FusedStep::Binary { op, input, chain_lhs: slot == 0 });
                }
            }
        }
        Ok((steps, inputs))
    }
}

impl Translate for Fuse {
    fn translate_node(
        &self,
        source: &TypedModel,
        node: &TypedNode,
        target: &mut TypedModel,
        mapping: &HashMap<OutletId, OutletId>,
    ) -> DiffResult<TVec<OutletId>> {
        if self.absorbed.contains(&node.id) {
            return Ok(tvec!());
        }
        if let Some(chain) = self.chains.get(&node.id) {
            let (steps, inputs) = Self::chain_steps(source, chain)?;
            let inputs = inputs
                .iter()
                .map(|i| mapping.get(i).copied().with_context(|| format!("{i:?} was not translated")))
                .collect::<DiffResult<TVec<_>>>()?;
            let op = FusedElementWise::new(steps, self.fallback);
            return target.wire_node(&node.name, op, &inputs);
        }
        let inputs = mapped_inputs(node, mapping)?;
        target.wire_node(&node.name, node.op.clone(), &inputs)
    }
}
