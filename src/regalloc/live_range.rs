// This module computes live ranges for virtual registers. The instruction list is walked
// in order and each instruction's index is its program position (ip). Every Virtual
// operand creates or extends the live range keyed by its virtual index to cover the
// current ip, records the operand slot (instruction index, operand index) so the rewrite
// step can later patch it in place, and pins the register's class: a virtual index used
// both as a scalar and as part of a vector group is rejected. Ranges are numbered densely
// in first-occurrence order and that number is the node index in the interference graph.
// All storage, including the virtual index lookup map, lives in the caller's arena.

//! Live-range analysis over a straight-line instruction list.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use hashbrown::{DefaultHashBuilder, HashMap};

use crate::core::error::RegAllocError;
use crate::core::shader::Instruction;
use crate::regalloc::classes::RegClass;

/// Location of one operand inside the instruction list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandSlot {
    pub instr: usize,
    pub operand: usize,
}

/// Span of program positions over which a virtual register is referenced.
#[derive(Debug)]
pub struct LiveRange<'a> {
    pub vreg: u32,
    pub class: RegClass,
    pub start: usize,
    pub end: usize,
    pub refs: BumpVec<'a, OperandSlot>,
}

impl LiveRange<'_> {
    pub fn overlaps(&self, other: &LiveRange<'_>) -> bool {
        ranges_overlap((self.start, self.end), (other.start, other.end))
    }
}

/// Whether two `[start, end]` spans interfere.
///
/// A range ending where another starts does not overlap it; same-instruction
/// hazards are handled separately by the interference graph.
pub fn ranges_overlap(a: (usize, usize), b: (usize, usize)) -> bool {
    !(a.0 >= b.1 || b.0 >= a.1)
}

/// All live ranges of one instruction list.
pub struct LiveRanges<'a> {
    ranges: BumpVec<'a, LiveRange<'a>>,
    by_vreg: HashMap<u32, usize, DefaultHashBuilder, &'a Bump>,
}

impl<'a> LiveRanges<'a> {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, node: usize) -> &LiveRange<'a> {
        &self.ranges[node]
    }

    /// Node index of a virtual register.
    pub fn node_of(&self, vreg: u32) -> Option<usize> {
        self.by_vreg.get(&vreg).copied()
    }

    pub fn by_vreg(&self, vreg: u32) -> Option<&LiveRange<'a>> {
        self.node_of(vreg).map(|n| &self.ranges[n])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveRange<'a>> {
        self.ranges.iter()
    }
}

/// Compute the live ranges of every virtual register in `instrs`.
pub fn compute_live_ranges<'a>(
    arena: &'a Bump,
    instrs: &[Instruction],
) -> Result<LiveRanges<'a>, RegAllocError> {
    let mut ranges: BumpVec<'a, LiveRange<'a>> = BumpVec::new_in(arena);
    let mut by_vreg = HashMap::new_in(arena);

    for (ip, instr) in instrs.iter().enumerate() {
        for (operand, op) in instr.operands.iter().enumerate() {
            let Some(vreg) = op.as_virtual() else {
                continue;
            };
            let class = RegClass::of(&vreg);
            let slot = OperandSlot { instr: ip, operand };

            match by_vreg.get(&vreg.index) {
                Some(&node) => {
                    let range: &mut LiveRange<'a> = &mut ranges[node];
                    if range.class != class {
                        return Err(RegAllocError::InconsistentVirtualRegisterUse {
                            index: vreg.index,
                            first: range.class,
                            second: class,
                        });
                    }
                    range.start = range.start.min(ip);
                    range.end = range.end.max(ip);
                    range.refs.push(slot);
                }
                None => {
                    let mut refs = BumpVec::new_in(arena);
                    refs.push(slot);
                    by_vreg.insert(vreg.index, ranges.len());
                    ranges.push(LiveRange {
                        vreg: vreg.index,
                        class,
                        start: ip,
                        end: ip,
                        refs,
                    });
                }
            }
        }
    }

    log::debug!(
        "computed {} live ranges over {} instructions",
        ranges.len(),
        instrs.len()
    );
    for range in ranges.iter() {
        log::trace!(
            "  %{} {:?} [{}, {}] ({} refs)",
            range.vreg,
            range.class,
            range.start,
            range.end,
            range.refs.len()
        );
    }

    Ok(LiveRanges { ranges, by_vreg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shader::{Component, Opcode, Operand};

    fn mov(dst: Operand, src: Operand) -> Instruction {
        Instruction::new(Opcode::Mov, [dst, src])
    }

    #[test]
    fn test_range_spans_first_to_last_use() {
        let instrs = [
            Instruction::new(Opcode::MovImm, [Operand::vtemp(0), Operand::imm(1)]),
            Instruction::new(Opcode::MovImm, [Operand::vtemp(1), Operand::imm(2)]),
            Instruction::new(Opcode::Nop, []),
            mov(Operand::vtemp(2), Operand::vtemp(0)),
            mov(Operand::vtemp(3), Operand::vtemp(1)),
            mov(Operand::temp(0), Operand::vtemp(0)),
        ];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();

        assert_eq!(ranges.len(), 4);
        let span = |v| {
            let r = ranges.by_vreg(v).unwrap();
            (r.start, r.end)
        };
        assert_eq!(span(0), (0, 5));
        assert_eq!(span(1), (1, 4));
        assert_eq!(span(2), (3, 3));
        assert_eq!(span(3), (4, 4));

        let refs: Vec<_> = ranges.by_vreg(0).unwrap().refs.iter().copied().collect();
        assert_eq!(
            refs,
            vec![
                OperandSlot { instr: 0, operand: 0 },
                OperandSlot { instr: 3, operand: 1 },
                OperandSlot { instr: 5, operand: 1 },
            ]
        );
    }

    #[test]
    fn test_nodes_numbered_in_first_use_order() {
        let instrs = [
            mov(Operand::vtemp(17), Operand::temp(0)),
            mov(Operand::vtemp(3), Operand::vtemp(17)),
        ];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        assert_eq!(ranges.node_of(17), Some(0));
        assert_eq!(ranges.node_of(3), Some(1));
        assert_eq!(ranges.node_of(4), None);
    }

    #[test]
    fn test_vector_class_recorded() {
        let instrs = [
            mov(Operand::vvec(0, Component::Lane(1)), Operand::temp(0)),
            Instruction::new(
                Opcode::PackU8888,
                [Operand::vtemp(1), Operand::vvec(0, Component::All)],
            ),
        ];
        let arena = Bump::new();
        let ranges = compute_live_ranges(&arena, &instrs).unwrap();
        assert_eq!(ranges.by_vreg(0).unwrap().class, RegClass::Vec4);
        assert_eq!(ranges.by_vreg(1).unwrap().class, RegClass::Temp);
    }

    #[test]
    fn test_inconsistent_class_rejected() {
        let instrs = [
            mov(Operand::vtemp(4), Operand::temp(0)),
            mov(Operand::temp(1), Operand::vvec(4, Component::All)),
        ];
        let arena = Bump::new();
        let err = compute_live_ranges(&arena, &instrs).err();
        assert_eq!(
            err,
            Some(RegAllocError::InconsistentVirtualRegisterUse {
                index: 4,
                first: RegClass::Temp,
                second: RegClass::Vec4
            })
        );
    }

    #[test]
    fn test_overlap_rule() {
        assert!(!ranges_overlap((0, 2), (3, 5)));
        assert!(ranges_overlap((0, 3), (2, 5)));
        assert!(ranges_overlap((2, 5), (0, 3)));
        assert!(!ranges_overlap((1, 1), (1, 1)));
        assert!(ranges_overlap((0, 10), (4, 6)));
    }
}
