use crate::internal::*;

/// A node in the graph: an op, its input wires, and the facts of its outputs.
#[derive(Clone)]
pub struct TypedNode {
    pub id: usize,
    pub name: String,
    pub inputs: Vec<OutletId>,
    pub op: Box<dyn TypedOp>,
    pub outputs: TVec<TypedFact>,
}

impl TypedNode {
    pub fn op(&self) -> &dyn TypedOp {
        &*self.op
    }

    pub fn op_as<O: TypedOp>(&self) -> Option<&O> {
        self.op.downcast_ref::<O>()
    }

    pub fn op_is<O: TypedOp>(&self) -> bool {
        self.op_as::<O>().is_some()
    }
}

impl fmt::Debug for TypedNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} \"{}\" {:?}", self.id, self.name, self.op)
    }
}

impl fmt::Display for TypedNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} \"{}\" {}", self.id, self.name, self.op.name())
    }
}

/// Identifies an output of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutletId {
    pub node: usize,
    pub slot: usize,
}

impl OutletId {
    pub fn new(node: usize, slot: usize) -> OutletId {
        OutletId { node, slot }
    }
}

/// Identifies an input of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InletId {
    pub node: usize,
    pub slot: usize,
}

impl InletId {
    pub fn new(node: usize, slot: usize) -> InletId {
        InletId { node, slot }
    }
}
