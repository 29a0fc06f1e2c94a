// This module groups the register allocator: the class layout a target exposes, arena bit
// sets, live-range analysis over a straight-line instruction list, the interference graph
// built from those ranges, and the graph-coloring pass that rewrites virtual operands to
// physical registers. Every structure except the class layout is scoped to one allocation
// pass and allocated in the arena passed to RegisterAllocator::allocate.

//! Graph-coloring register allocation for shader instruction lists.

pub mod allocator;
pub mod classes;
pub mod interference;
pub mod live_range;
pub mod node_set;

pub use allocator::{AllocationSummary, RegisterAllocator, RegisterUsage};
pub use classes::{RegClass, RegisterClass, RegisterClassConfig, RegisterClassSet};
pub use interference::{build_interference, InterferenceGraph};
pub use live_range::{compute_live_ranges, ranges_overlap, LiveRange, LiveRanges, OperandSlot};
pub use node_set::BitSet;
