// This module builds the interference graph for one allocation pass. There is one node per
// live range (node index = dense live-range number) tagged with the range's register class.
// Adjacency is stored twice, as a bit row per node for constant-time edge queries and as a
// neighbor list per node for iteration during simplify and select; both live in the pass
// arena and are dropped with it. Edges come from two sources: every pair of ranges whose
// spans overlap, and within each instruction the destination (operand 0, when virtual)
// against every other virtual operand. The second rule catches a source read in the same
// cycle the destination is written, which identical single-point ranges would otherwise
// miss. Edges are undirected and idempotent; self edges are never added.

//! Interference graph construction.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use crate::core::shader::Instruction;
use crate::regalloc::classes::RegClass;
use crate::regalloc::live_range::LiveRanges;
use crate::regalloc::node_set::BitSet;

pub struct InterferenceGraph<'a> {
    classes: BumpVec<'a, RegClass>,
    rows: BumpVec<'a, BitSet<'a>>,
    neighbors: BumpVec<'a, BumpVec<'a, u32>>,
    edges: usize,
}

impl<'a> InterferenceGraph<'a> {
    /// Graph with `classes.len()` nodes and no edges.
    pub fn new_in(arena: &'a Bump, classes: impl IntoIterator<Item = RegClass>) -> Self {
        let mut node_classes = BumpVec::new_in(arena);
        node_classes.extend(classes);
        let n = node_classes.len();

        let mut rows = BumpVec::with_capacity_in(n, arena);
        let mut neighbors = BumpVec::with_capacity_in(n, arena);
        for _ in 0..n {
            rows.push(BitSet::new_in(n, arena));
            neighbors.push(BumpVec::new_in(arena));
        }

        Self {
            classes: node_classes,
            rows,
            neighbors,
            edges: 0,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.classes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges
    }

    pub fn class(&self, node: usize) -> RegClass {
        self.classes[node]
    }

    /// Add the undirected edge `a`-`b`. Returns false for self edges and
    /// edges already present.
    pub fn add_edge(&mut self, a: usize, b: usize) -> bool {
        if a == b || self.rows[a].contains(b) {
            return false;
        }
        self.rows[a].insert(b);
        self.rows[b].insert(a);
        self.neighbors[a].push(b as u32);
        self.neighbors[b].push(a as u32);
        self.edges += 1;
        true
    }

    pub fn interferes(&self, a: usize, b: usize) -> bool {
        self.rows[a].contains(b)
    }

    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors[node].iter().map(|&n| n as usize)
    }

    pub fn degree(&self, node: usize) -> usize {
        self.neighbors[node].len()
    }
}

/// Build the interference graph for `ranges` over `instrs`.
pub fn build_interference<'a>(
    arena: &'a Bump,
    ranges: &LiveRanges<'_>,
    instrs: &[Instruction],
) -> InterferenceGraph<'a> {
    let mut graph = InterferenceGraph::new_in(arena, ranges.iter().map(|r| r.class));
    let n = ranges.len();

    for a in 0..n {
        for b in (a + 1)..n {
            if ranges.get(a).overlaps(ranges.get(b)) {
                graph.add_edge(a, b);
            }
        }
    }
    let overlap_edges = graph.num_edges();

    for instr in instrs {
        let Some(dest) = instr.operands.first().and_then(|op| op.as_virtual()) else {
            continue;
        };
        let Some(dest_node) = ranges.node_of(dest.index) else {
            continue;
        };
        for src in instr.operands[1..].iter().filter_map(|op| op.as_virtual()) {
            if let Some(src_node) = ranges.node_of(src.index) {
                graph.add_edge(dest_node, src_node);
            }
        }
    }

    log::debug!(
        "interference graph: {} nodes, {} edges ({} from overlap, {} same-instruction)",
        n,
        graph.num_edges(),
        overlap_edges,
        graph.num_edges() - overlap_edges
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shader::{Opcode, Operand};
    use crate::regalloc::live_range::compute_live_ranges;

    #[test]
    fn test_add_edge_is_idempotent() {
        let arena = Bump::new();
        let mut graph = InterferenceGraph::new_in(&arena, [RegClass::Temp; 3]);

        assert!(graph.add_edge(0, 2));
        assert!(!graph.add_edge(2, 0));
        assert!(!graph.add_edge(1, 1));
        assert_eq!(graph.num_edges(), 1);
        assert!(graph.interferes(2, 0));
        assert!(!graph.interferes(0, 1));
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.neighbors(2).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_overlapping_ranges_interfere() {
        // %0 lives [0, 3], %1 lives [2, 5], %2 lives [4, 4]
        let instrs = [
            Instruction::new(Opcode::MovImm, [Operand::vtemp(0), Operand::imm(0)]),
            Instruction::new(Opcode::Nop, []),
            Instruction::new(Opcode::MovImm, [Operand::vtemp(1), Operand::imm(1)]),
            Instruction::new(Opcode::Mov, [Operand::temp(0), Operand::vtemp(0)]),
            Instruction::new(Opcode::MovImm, [Operand::vtemp(2), Operand::imm(2)]),
            Instruction::new(Opcode::Mov, [Operand::temp(1), Operand::vtemp(1)]),
        ];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        let graph = build_interference(&arena, &ranges, &instrs);

        let node = |v| ranges.node_of(v).unwrap();
        assert!(graph.interferes(node(0), node(1)));
        assert!(graph.interferes(node(1), node(2)));
        assert!(!graph.interferes(node(0), node(2)));
        assert_eq!(graph.num_edges(), 2);
    }

    #[test]
    fn test_disjoint_ranges_do_not_interfere() {
        // %0 lives [0, 2], %1 lives [3, 5]
        let instrs = [
            Instruction::new(Opcode::MovImm, [Operand::vtemp(0), Operand::imm(0)]),
            Instruction::new(Opcode::Nop, []),
            Instruction::new(Opcode::Mov, [Operand::temp(0), Operand::vtemp(0)]),
            Instruction::new(Opcode::MovImm, [Operand::vtemp(1), Operand::imm(1)]),
            Instruction::new(Opcode::Nop, []),
            Instruction::new(Opcode::Mov, [Operand::temp(1), Operand::vtemp(1)]),
        ];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        let graph = build_interference(&arena, &ranges, &instrs);
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_destination_and_source_interfere_on_one_instruction() {
        // Both ranges are the single point [0, 0], so only the same-instruction rule applies.
        let instrs = [Instruction::new(
            Opcode::Max,
            [Operand::vtemp(0), Operand::vtemp(1), Operand::temp(3)],
        )];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        let graph = build_interference(&arena, &ranges, &instrs);

        assert!(graph.interferes(0, 1));
        assert_eq!(graph.num_edges(), 1);
    }

    #[test]
    fn test_sources_alone_do_not_interfere() {
        // Two sources of one instruction, destination physical.
        let instrs = [Instruction::new(
            Opcode::Max,
            [Operand::temp(0), Operand::vtemp(0), Operand::vtemp(1)],
        )];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        let graph = build_interference(&arena, &ranges, &instrs);
        assert_eq!(graph.num_edges(), 0);
    }

    #[test]
    fn test_node_classes_follow_ranges() {
        use crate::core::shader::Component;
        let instrs = [Instruction::new(
            Opcode::PackU8888,
            [Operand::vtemp(0), Operand::vvec(1, Component::All)],
        )];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        let graph = build_interference(&arena, &ranges, &instrs);
        assert_eq!(graph.class(0), RegClass::Temp);
        assert_eq!(graph.class(1), RegClass::Vec4);
        assert!(graph.interferes(0, 1));
    }
}
