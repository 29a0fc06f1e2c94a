//! Shader backend core: register allocation and ISA encoding.
//!
//! A shader arrives as an ordered list of [`Instruction`]s whose allocatable
//! operands are virtual registers. Compilation first colors the interference
//! graph of those registers and rewrites every operand to a physical register
//! in place, then packs each instruction into 8 or 16 bytes using the static
//! encoding table and pads the stream with `0xff` to a 16-byte boundary.
//!
//! # Primary Usage
//!
//! ```
//! use shader_backend::{compile_shader, CompileSession, Instruction, Opcode, Operand};
//! use shader_backend::{RegisterClassSet, Shader, ShaderStage};
//!
//! let classes = RegisterClassSet::rogue();
//! let mut session = CompileSession::new();
//!
//! let mut shader = Shader::new(ShaderStage::Fragment);
//! shader
//!     .push(Instruction::new(Opcode::MovImm, [Operand::vtemp(0), Operand::imm(5)]))
//!     .push(Instruction::new(Opcode::EndFrag, []));
//!
//! let binary = compile_shader(&mut session, &classes, &mut shader)?;
//! assert_eq!(binary.code.len() % 16, 0);
//! # Ok::<(), shader_backend::CompileError>(())
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Shader data model, errors, compilation session
//! - [`regalloc`] - Live ranges, interference graph, graph-coloring allocator
//! - [`isa`] - Bit-range packing, value encoders, encoding table, encoder

pub mod core;
pub mod isa;
pub mod regalloc;

pub use core::{
    // Data model
    Component, Drc, InstrFlag, InstrFlags, Instruction, Opcode, Operand, PhysReg, RegBank,
    Shader, ShaderStage, VirtReg, NUM_DRCS,
    // Errors
    CompileError, CompileResult, ConfigError, EncodeError, RegAllocError, TableError,
    // Session management
    CompileSession, SessionStats, ShaderBinary,
};
pub use isa::{encode_instr, encode_shader, validate_table, BitRange, EncodedShader};
pub use regalloc::{
    RegClass, RegisterAllocator, RegisterClass, RegisterClassConfig, RegisterClassSet,
    RegisterUsage,
};

/// Allocate registers for `shader` in place and encode it.
///
/// Scratch memory comes from the session arena and is released before this
/// returns. Any allocation or encoding failure aborts the whole shader.
pub fn compile_shader(
    session: &mut CompileSession,
    classes: &RegisterClassSet,
    shader: &mut Shader,
) -> CompileResult<ShaderBinary> {
    session.compile(classes, shader)
}
