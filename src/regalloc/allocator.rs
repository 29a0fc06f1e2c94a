// This module is the allocation pass proper. It runs live-range analysis and interference
// construction in the caller's arena, then colors the graph Chaitin-Briggs style. Simplify
// repeatedly removes a node whose same-class degree is below the number of allocation units
// of its class; when none exists it optimistically removes the node of highest degree and
// keeps going. Select pops nodes in reverse removal order and gives each the lowest aligned
// unit not taken by an already-colored neighbor of the same class (nodes of different
// classes live in disjoint parts of the unified number space and cannot conflict). A node
// with no free unit is an allocation failure: there is no spilling, so the pass stops
// without touching the instruction list. Finally every recorded operand slot is rewritten
// from its virtual register to the physical register of its class bank, adding the lane
// for single-component vector references, and per-class usage is reported.

//! Graph-coloring register allocation.

use std::fmt;

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use crate::core::error::RegAllocError;
use crate::core::shader::{Component, Instruction, Operand, PhysReg};
use crate::regalloc::classes::{RegClass, RegisterClassSet};
use crate::regalloc::interference::{build_interference, InterferenceGraph};
use crate::regalloc::live_range::{compute_live_ranges, LiveRanges, OperandSlot};
use crate::regalloc::node_set::BitSet;

/// Registers used per class after allocation: one past the highest physical
/// number any rewritten operand of the class refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterUsage {
    used: [u32; RegClass::COUNT],
}

impl RegisterUsage {
    pub fn get(&self, class: RegClass) -> u32 {
        self.used[class.index()]
    }

    pub fn temps(&self) -> u32 {
        self.get(RegClass::Temp)
    }

    pub fn internals(&self) -> u32 {
        self.get(RegClass::Vec4)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegClass, u32)> + '_ {
        RegClass::ALL.into_iter().map(|class| (class, self.get(class)))
    }

    /// Raise the count of `class` to at least `used`.
    pub fn record(&mut self, class: RegClass, used: u32) {
        let slot = &mut self.used[class.index()];
        *slot = (*slot).max(used);
    }

    /// Per-class maximum of two reports.
    pub fn merge(&mut self, other: &RegisterUsage) {
        for (class, used) in other.iter() {
            self.record(class, used);
        }
    }
}

impl fmt::Display for RegisterUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "temps: {}, internals: {}", self.temps(), self.internals())
    }
}

/// Outcome of one successful allocation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationSummary {
    pub usage: RegisterUsage,
    pub virtual_registers: usize,
    pub interference_edges: usize,
}

/// Allocator bound to a class layout. Holds no per-shader state.
#[derive(Debug, Clone, Copy)]
pub struct RegisterAllocator<'c> {
    classes: &'c RegisterClassSet,
}

impl<'c> RegisterAllocator<'c> {
    pub fn new(classes: &'c RegisterClassSet) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &'c RegisterClassSet {
        self.classes
    }

    /// Assign physical registers to every virtual operand of `instrs`.
    ///
    /// Scratch state is allocated in `arena`. On error the instruction
    /// list is left unchanged.
    pub fn allocate(
        &self,
        arena: &Bump,
        instrs: &mut [Instruction],
    ) -> Result<AllocationSummary, RegAllocError> {
        let ranges = compute_live_ranges(arena, instrs)?;
        let graph = build_interference(arena, &ranges, instrs);

        let order = self.simplify(arena, &graph);
        let assigned = self.select(arena, &graph, &ranges, &order)?;
        let usage = self.rewrite(arena, &ranges, &assigned, instrs)?;

        log::debug!(
            "allocated {} virtual registers ({} interference edges), {}",
            ranges.len(),
            graph.num_edges(),
            usage
        );
        Ok(AllocationSummary {
            usage,
            virtual_registers: ranges.len(),
            interference_edges: graph.num_edges(),
        })
    }

    fn slots(&self, class: RegClass) -> usize {
        self.classes.get(class).slots() as usize
    }

    /// Removal order of the nodes, first removed first.
    fn simplify<'a>(
        &self,
        arena: &'a Bump,
        graph: &InterferenceGraph<'_>,
    ) -> BumpVec<'a, usize> {
        let n = graph.num_nodes();
        let mut degree = BumpVec::with_capacity_in(n, arena);
        degree.extend((0..n).map(|node| {
            graph
                .neighbors(node)
                .filter(|&nb| graph.class(nb) == graph.class(node))
                .count()
        }));
        let mut removed = BitSet::new_in(n, arena);
        let mut stack = BumpVec::with_capacity_in(n, arena);

        while stack.len() < n {
            let trivial = (0..n).rev().find(|&node| {
                !removed.contains(node) && degree[node] < self.slots(graph.class(node))
            });
            let node = match trivial {
                Some(node) => node,
                None => {
                    // Highest degree, lowest index on ties.
                    let Some(node) = (0..n)
                        .rev()
                        .filter(|&node| !removed.contains(node))
                        .max_by_key(|&node| degree[node])
                    else {
                        break;
                    };
                    log::trace!(
                        "optimistically removing node {} (degree {})",
                        node,
                        degree[node]
                    );
                    node
                }
            };

            removed.insert(node);
            stack.push(node);
            for nb in graph.neighbors(node) {
                if !removed.contains(nb) && graph.class(nb) == graph.class(node) {
                    degree[nb] -= 1;
                }
            }
        }
        stack
    }

    /// Unified register number of each node.
    fn select<'a>(
        &self,
        arena: &'a Bump,
        graph: &InterferenceGraph<'_>,
        ranges: &LiveRanges<'_>,
        order: &[usize],
    ) -> Result<BumpVec<'a, Option<u32>>, RegAllocError> {
        let mut assigned = BumpVec::with_capacity_in(graph.num_nodes(), arena);
        assigned.resize(graph.num_nodes(), None);

        for &node in order.iter().rev() {
            let class = self.classes.get(graph.class(node));
            let mut blocked = BitSet::new_in(class.slots() as usize, arena);
            for nb in graph.neighbors(node) {
                if graph.class(nb) != class.class {
                    continue;
                }
                if let Some(unified) = assigned[nb] {
                    blocked.insert(((unified - class.base) / class.stride) as usize);
                }
            }

            let slot = (0..class.slots())
                .find(|&slot| !blocked.contains(slot as usize))
                .ok_or(RegAllocError::AllocationFailure {
                    class: class.class,
                    virtual_index: ranges.get(node).vreg,
                })?;
            let unified = class.slot_base(slot);
            log::trace!(
                "  %{} -> {:?} unit {} (unified {})",
                ranges.get(node).vreg,
                class.class,
                slot,
                unified
            );
            assigned[node] = Some(unified);
        }
        Ok(assigned)
    }

    fn rewrite(
        &self,
        arena: &Bump,
        ranges: &LiveRanges<'_>,
        assigned: &[Option<u32>],
        instrs: &mut [Instruction],
    ) -> Result<RegisterUsage, RegAllocError> {
        let mut patches: BumpVec<'_, (OperandSlot, PhysReg)> = BumpVec::new_in(arena);
        let mut usage = RegisterUsage::default();

        for (range, unified) in ranges.iter().zip(assigned) {
            let Some(unified) = *unified else {
                continue;
            };
            let class = self.classes.get(range.class);
            let group = unified - class.base;

            for slot in range.refs.iter() {
                let mut number = group;
                if let Operand::Virtual(vreg) = instrs[slot.instr].operands[slot.operand] {
                    if let Some(Component::Lane(lane)) = vreg.vector {
                        if u32::from(lane) >= class.stride {
                            return Err(RegAllocError::ComponentOutOfRange {
                                index: range.vreg,
                                lane,
                                stride: class.stride,
                            });
                        }
                        number += u32::from(lane);
                    }
                }
                usage.record(range.class, number + 1);
                patches.push((*slot, PhysReg::new(class.bank, number)));
            }
        }

        for (slot, reg) in patches {
            instrs[slot.instr].operands[slot.operand] = Operand::Physical(reg);
        }
        Ok(usage)
    }
}
