// This module holds the infrastructure shared by both halves of the backend: the shader
// data model (operands, opcodes, flags, instructions and shaders), the error taxonomy, and
// the compilation session that owns the per-shader arena and accumulates statistics.

//! Core backend infrastructure
//!
//! - `shader`: instruction representation consumed by the allocator and encoder
//! - `error`: error enums and the `CompileResult` alias
//! - `session`: arena-backed compilation session and [`SessionStats`]

pub mod error;
pub mod session;
pub mod shader;

pub use error::{CompileError, CompileResult, ConfigError, EncodeError, RegAllocError, TableError};
pub use session::{CompileSession, SessionStats, ShaderBinary};
pub use shader::{
    Component, Drc, InstrFlag, InstrFlags, Instruction, Opcode, Operand, PhysReg, RegBank, Shader,
    ShaderStage, VirtReg, NUM_DRCS,
};
