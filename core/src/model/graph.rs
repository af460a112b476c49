use crate::internal::*;
use crate::ops::konst::Const;
use crate::ops::source::TypedSource;
use itertools::Itertools;

/// Main model class.
///
/// Nodes are stored in insertion order, and a node can only be wired to
/// outlets of nodes inserted before it, so the node vector is always a
/// valid evaluation order.
#[derive(Clone, Default)]
pub struct TypedModel {
    /// all nodes in the model
    pub nodes: Vec<TypedNode>,
    /// model inputs
    pub inputs: Vec<OutletId>,
    /// model outputs
    pub outputs: Vec<OutletId>,
}

impl TypedModel {
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Box<dyn TypedOp>>,
        output_facts: TVec<TypedFact>,
    ) -> DiffResult<usize> {
        let id = self.nodes.len();
        let node =
            TypedNode { id, name: name.into(), op: op.into(), inputs: vec![], outputs: output_facts };
        self.nodes.push(node);
        Ok(id)
    }

    pub fn add_source(&mut self, name: impl Into<String>, fact: TypedFact) -> DiffResult<OutletId> {
        let fact = fact.without_value();
        let id = self.add_node(name, TypedSource::new(fact.clone()), tvec!(fact))?;
        let id = OutletId::new(id, 0);
        self.inputs.push(id);
        Ok(id)
    }

    pub fn add_const(&mut self, name: impl Into<String>, v: impl IntoArcTensor) -> DiffResult<OutletId> {
        let v = v.into_arc_tensor();
        let fact = TypedFact::from(v.clone());
        let id = self.add_node(name, Const(v), tvec!(fact))?;
        Ok(OutletId::new(id, 0))
    }

    /// Add a node, infer its output facts from its inputs, and connect it.
    pub fn wire_node(
        &mut self,
        name: impl Into<String>,
        op: impl Into<Box<dyn TypedOp>>,
        inputs: &[OutletId],
    ) -> DiffResult<TVec<OutletId>> {
        let name = name.into();
        let op = op.into();
        for i in inputs {
            ensure!(
                i.node < self.nodes.len() && i.slot < self.nodes[i.node].outputs.len(),
                "Wiring {name}: no such outlet {i:?}"
            );
        }
        let output_facts = {
            let input_facts: TVec<&TypedFact> =
                inputs.iter().map(|o| self.outlet_fact(*o)).collect::<DiffResult<_>>()?;
            op.output_facts(&input_facts).with_context(|| {
                format!("Wiring node \"{}\", {:?} with inputs {:?}", name, op, input_facts)
            })?
        };
        let id = self.add_node(name, op, output_facts)?;
        self.nodes[id].inputs = inputs.to_vec();
        Ok((0..self.nodes[id].outputs.len()).map(|slot| OutletId::new(id, slot)).collect())
    }

    pub fn node(&self, id: usize) -> &TypedNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[TypedNode] {
        &self.nodes
    }

    pub fn node_by_name(&self, name: impl AsRef<str>) -> DiffResult<&TypedNode> {
        let name = name.as_ref();
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .with_context(|| format!("No node found for name: \"{name}\""))
    }

    pub fn input_outlets(&self) -> &[OutletId] {
        &self.inputs
    }

    pub fn output_outlets(&self) -> &[OutletId] {
        &self.outputs
    }

    pub fn set_output_outlets(&mut self, outputs: &[OutletId]) -> DiffResult<()> {
        for o in outputs {
            self.outlet_fact(*o)?;
        }
        self.outputs = outputs.to_vec();
        Ok(())
    }

    pub fn outlet_fact(&self, outlet: OutletId) -> DiffResult<&TypedFact> {
        self.nodes
            .get(outlet.node)
            .and_then(|n| n.outputs.get(outlet.slot))
            .with_context(|| format!("Invalid outlet reference: {outlet:?}"))
    }

    pub fn input_fact(&self, ix: usize) -> DiffResult<&TypedFact> {
        let input = *self.inputs.get(ix).with_context(|| format!("No input #{ix}"))?;
        self.outlet_fact(input)
    }

    pub fn output_fact(&self, ix: usize) -> DiffResult<&TypedFact> {
        let output = *self.outputs.get(ix).with_context(|| format!("No output #{ix}"))?;
        self.outlet_fact(output)
    }

    pub fn node_input_facts(&self, id: usize) -> DiffResult<TVec<&TypedFact>> {
        self.nodes[id].inputs.iter().map(|o| self.outlet_fact(*o)).collect()
    }

    /// Inlets consuming the given outlet.
    pub fn outlet_successors(&self, outlet: OutletId) -> TVec<InletId> {
        self.nodes
            .iter()
            .flat_map(|n| {
                n.inputs
                    .iter()
                    .enumerate()
                    .filter(|(_, i)| **i == outlet)
                    .map(move |(slot, _)| InletId::new(n.id, slot))
            })
            .collect()
    }

    /// Number of nodes with the given op type.
    pub fn count_ops<O: TypedOp>(&self) -> usize {
        self.nodes.iter().filter(|n| n.op_is::<O>()).count()
    }

    /// Sanity check: wires point backwards, facts agree with what the ops infer.
    pub fn check_consistency(&self) -> DiffResult<()> {
        for node in &self.nodes {
            for i in &node.inputs {
                ensure!(i.node < node.id, "{node} is wired to {i:?} which is not before it");
            }
            if node.op_is::<TypedSource>() || node.op_is::<Const>() {
                continue;
            }
            let inputs = self.node_input_facts(node.id)?;
            let expected = node.op.output_facts(&inputs)?;
            ensure!(
                expected.len() == node.outputs.len()
                    && expected.iter().zip(node.outputs.iter()).all(|(a, b)| a.same_type_and_shape(b)),
                "{node}: stored facts {:?} disagree with inferred facts {:?}",
                node.outputs,
                expected
            );
        }
        Ok(())
    }
}

impl fmt::Debug for TypedModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TypedModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for node in &self.nodes {
            writeln!(
                f,
                "{} <- [{}] -> [{}]",
                node,
                node.inputs.iter().map(|i| format!("{}/{}", i.node, i.slot)).join(", "),
                node.outputs.iter().map(|o| format!("{o:?}")).join(", "),
            )?;
        }
        write!(
            f,
            "outputs: [{}]",
            self.outputs.iter().map(|o| format!("{}/{}", o.node, o.slot)).join(", ")
        )
    }
}
