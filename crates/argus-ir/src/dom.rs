use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::block::Block;
use crate::function::Func;
use crate::module::Module;

/// Per-function dominator tree over basic blocks.
///
/// Answers exactly the queries the analysis needs: proper dominance between
/// two blocks and reachability from the entry block.
pub struct DomTree {
    entry: Option<Block>,
    nodes: FxHashMap<Block, NodeIndex>,
    doms: Option<Dominators<NodeIndex>>,
}

impl DomTree {
    pub fn compute(module: &Module, func: Func) -> Self {
        let info = module.func(func);
        let mut graph: DiGraph<Block, ()> = DiGraph::new();
        let mut nodes = FxHashMap::default();
        for &b in info.blocks() {
            let idx = graph.add_node(b);
            nodes.insert(b, idx);
        }
        for &b in info.blocks() {
            for succ in module.successors(b) {
                if let (Some(&from), Some(&to)) = (nodes.get(&b), nodes.get(&succ)) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        let entry = info.entry();
        let doms = entry.map(|e| dominators::simple_fast(&graph, nodes[&e]));
        DomTree { entry, nodes, doms }
    }

    pub fn entry(&self) -> Option<Block> {
        self.entry
    }

    pub fn is_reachable_from_entry(&self, b: Block) -> bool {
        if self.entry == Some(b) {
            return true;
        }
        let (Some(doms), Some(&node)) = (self.doms.as_ref(), self.nodes.get(&b)) else {
            return false;
        };
        doms.immediate_dominator(node).is_some()
    }

    /// `a` dominates `b`: every path from entry to `b` goes through `a`.
    /// Unreachable blocks are dominated by nothing.
    pub fn dominates(&self, a: Block, b: Block) -> bool {
        if a == b {
            return self.is_reachable_from_entry(a);
        }
        let (Some(doms), Some(&node_b)) = (self.doms.as_ref(), self.nodes.get(&b)) else {
            return false;
        };
        let Some(&node_a) = self.nodes.get(&a) else {
            return false;
        };
        let mut cur = node_b;
        while let Some(idom) = doms.immediate_dominator(cur) {
            if idom == node_a {
                return true;
            }
            cur = idom;
        }
        false
    }

    pub fn properly_dominates(&self, a: Block, b: Block) -> bool {
        a != b && self.dominates(a, b)
    }
}
