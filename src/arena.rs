//! Node arena.
//!
//! Every wire bound into a circuit owns one slot here, and the slot index is
//! the identity the evaluation cache is keyed by. A rebind replaces the node
//! in place; the circuit clears the cache whenever that happens.

use crate::signal_ir::Node;

/// Identity of a node inside one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a node and returns its fresh identity.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Swaps the node stored at `id`, returning the old one.
    pub fn replace(&mut self, id: NodeId, node: Node) -> Option<Node> {
        self.nodes
            .get_mut(id.index())
            .map(|slot| std::mem::replace(slot, node))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
