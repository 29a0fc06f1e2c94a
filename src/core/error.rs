// This module defines the error taxonomy of the shader backend using the thiserror crate.
// EncodeError covers everything that can go wrong while packing an instruction into ISA
// bytes: a value wider than its field, register banks or numbers that do not fit their
// encoder, out-of-domain scale immediates, reserved mapping kinds, and operands that are
// still virtual or of the wrong variant for their mapping. RegAllocError covers an
// uncolorable interference graph (there is no spilling, so this is final), a virtual
// register used with conflicting classes, and vector lanes outside their group. TableError
// reports inconsistencies in an encoding table, ConfigError rejects malformed register
// class layouts, and CompileError wraps the pass-level errors for the pipeline entry point.
// None of these are retried: inputs are deterministic and a failure aborts the shader.

//! Error types for the shader backend.

use thiserror::Error;

use crate::core::shader::{Opcode, RegBank};
use crate::regalloc::RegClass;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("value {value:#x} does not fit in {bits} bits")]
    ValueOutOfRange { value: u64, bits: usize },

    #[error("bit range starting at {start} ({num} bits) lies outside a {width}-bit word")]
    RangeOutsideWord { start: usize, num: usize, width: usize },

    #[error("register bank selector {bank} does not fit in {bits} bits")]
    RegisterBankOutOfRange { bank: u64, bits: u32 },

    #[error("register number {number} does not fit in {bits} bits")]
    RegisterNumberOutOfRange { number: u64, bits: u32 },

    #[error("scale {0} is outside 1..=16")]
    ScaleOutOfRange(u64),

    #[error("DRC {0} is out of range")]
    DrcOutOfRange(u64),

    #[error("{opcode}: operand flag mapping for operand {index} is not supported")]
    UnsupportedMapping { opcode: Opcode, index: usize },

    #[error("{opcode}: operand {index} is still a virtual register")]
    UnallocatedOperand { opcode: Opcode, index: usize },

    #[error("{opcode}: operand {index} cannot be encoded as {expected}")]
    OperandMismatch {
        opcode: Opcode,
        index: usize,
        expected: &'static str,
    },

    #[error("{opcode}: expected {expected} operands, found {found}")]
    OperandCount {
        opcode: Opcode,
        expected: usize,
        found: usize,
    },

    #[error("{opcode}: descriptor is {bytes} bytes wide")]
    DescriptorTooWide { opcode: Opcode, bytes: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegAllocError {
    #[error("out of {class:?} registers while coloring virtual register %{virtual_index} (spilling is not implemented)")]
    AllocationFailure { class: RegClass, virtual_index: u32 },

    #[error("virtual register %{index} used as both {first:?} and {second:?}")]
    InconsistentVirtualRegisterUse {
        index: u32,
        first: RegClass,
        second: RegClass,
    },

    #[error("virtual register %{index} lane {lane} is outside its {stride}-register group")]
    ComponentOutOfRange { index: u32, lane: u8, stride: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("{opcode}: instruction width {bytes} bytes is not supported")]
    BadWidth { opcode: Opcode, bytes: usize },

    #[error("{opcode}: mapping {mapping} range starting at bit {start} ({num} bits) is outside the word")]
    RangeOutsideWord {
        opcode: Opcode,
        mapping: usize,
        start: usize,
        num: usize,
    },

    #[error("{opcode}: mapping {mapping} covers {found} bits, its encoder needs {expected}")]
    WidthMismatch {
        opcode: Opcode,
        mapping: usize,
        expected: usize,
        found: usize,
    },

    #[error("{opcode}: mapping {mapping} overlaps an earlier field at bit {bit}")]
    Overlap {
        opcode: Opcode,
        mapping: usize,
        bit: usize,
    },

    #[error("{opcode}: mapping {mapping} references operand {index}, opcode has {count}")]
    OperandIndex {
        opcode: Opcode,
        mapping: usize,
        index: usize,
        count: usize,
    },

    #[error("{opcode}: base bytes have bit {bit} set inside mapping {mapping}")]
    BaseBitSet {
        opcode: Opcode,
        mapping: usize,
        bit: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{class:?} class has stride 0")]
    ZeroStride { class: RegClass },

    #[error("{class:?} class count {count} is not a multiple of its stride {stride}")]
    StrideMismatch {
        class: RegClass,
        count: u32,
        stride: u32,
    },

    #[error("{class:?} class maps to bank {bank:?}, which is not allocatable")]
    BankNotAllocatable { class: RegClass, bank: RegBank },

    #[error("{class:?} class extends the unified register space past u32::MAX")]
    LayoutOverflow { class: RegClass },
}

/// Error returned by the allocate-then-encode pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("register allocation failed: {0}")]
    RegAlloc(#[from] RegAllocError),

    #[error("instruction encoding failed at ip {ip}: {source}")]
    Encode {
        ip: usize,
        #[source]
        source: EncodeError,
    },
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
