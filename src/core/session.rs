// This module provides arena-based compilation session management using the bumpalo crate.
// A CompileSession owns one Bump arena that backs every transient structure of the
// register allocator (live ranges, operand back-references, interference rows and the
// virtual index lookup map). Compiling a shader runs allocation and then encoding with that
// arena and resets it afterwards, so nothing allocated for one shader survives into the
// next and the arena's chunks are reused. The session also accumulates SessionStats across
// shaders: counts of compiled and failed shaders, encoded instructions per opcode, emitted
// and padding bytes, virtual registers and interference edges seen, the per-class peak of
// registers used, and the largest arena footprint of a single shader. The register class
// layout is passed in per call and never stored, so one layout can serve many sessions.

//! Arena-based compilation session management.
//!
//! One session compiles any number of shaders sequentially. All allocator
//! scratch data lives in the session arena for the duration of a single
//! shader only.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::fmt;

use crate::core::error::CompileResult;
use crate::core::shader::{Opcode, Shader, ShaderStage};
use crate::isa::encoder::{encode_shader, EncodedShader};
use crate::regalloc::{AllocationSummary, RegisterAllocator, RegisterClassSet, RegisterUsage};

/// Output of compiling one shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBinary {
    pub stage: ShaderStage,
    /// Encoded instructions followed by padding to the instruction alignment.
    pub code: Vec<u8>,
    pub usage: RegisterUsage,
    pub instructions: usize,
    pub padding: usize,
}

impl ShaderBinary {
    /// Length of the stream without trailing padding.
    pub fn code_len(&self) -> usize {
        self.code.len() - self.padding
    }
}

/// Compilation session owning the per-shader arena.
pub struct CompileSession {
    /// Scratch arena, reset after every shader.
    arena: Bump,

    stats: SessionStats,
}

impl CompileSession {
    pub fn new() -> Self {
        Self {
            arena: Bump::new(),
            stats: SessionStats::default(),
        }
    }

    /// Session whose arena starts with room for `bytes` bytes.
    pub fn with_arena_capacity(bytes: usize) -> Self {
        Self {
            arena: Bump::with_capacity(bytes),
            stats: SessionStats::default(),
        }
    }

    /// Get access to the arena allocator.
    pub fn arena(&self) -> &Bump {
        &self.arena
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Allocate registers for `shader` in place, then encode it.
    ///
    /// On error the session counts a failure and the arena is still reset.
    pub fn compile(
        &mut self,
        classes: &RegisterClassSet,
        shader: &mut Shader,
    ) -> CompileResult<ShaderBinary> {
        log::debug!(
            "compiling {:?} shader with {} instructions",
            shader.stage,
            shader.len()
        );

        let result = compile_in(&self.arena, classes, shader);

        let arena_bytes = self.arena.allocated_bytes();
        self.stats.peak_arena_bytes = self.stats.peak_arena_bytes.max(arena_bytes);
        self.arena.reset();

        match result {
            Ok((summary, encoded)) => {
                self.record_compiled(shader, &summary, &encoded);
                Ok(ShaderBinary {
                    stage: shader.stage,
                    code: encoded.code,
                    usage: summary.usage,
                    instructions: encoded.instructions,
                    padding: encoded.padding,
                })
            }
            Err(err) => {
                log::debug!("shader compilation failed: {}", err);
                self.stats.shaders_failed += 1;
                Err(err)
            }
        }
    }

    fn record_compiled(
        &mut self,
        shader: &Shader,
        summary: &AllocationSummary,
        encoded: &EncodedShader,
    ) {
        let stats = &mut self.stats;
        stats.shaders_compiled += 1;
        stats.instructions_encoded += encoded.instructions;
        stats.bytes_emitted += encoded.code.len();
        stats.padding_bytes += encoded.padding;
        stats.virtual_registers += summary.virtual_registers;
        stats.interference_edges += summary.interference_edges;
        stats.registers_used.merge(&summary.usage);
        for instr in &shader.instrs {
            *stats.opcode_counts.entry(instr.opcode).or_insert(0) += 1;
        }
    }
}

impl Default for CompileSession {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_in(
    arena: &Bump,
    classes: &RegisterClassSet,
    shader: &mut Shader,
) -> CompileResult<(AllocationSummary, EncodedShader)> {
    let summary = RegisterAllocator::new(classes).allocate(arena, &mut shader.instrs)?;
    let encoded = encode_shader(&shader.instrs)?;
    Ok((summary, encoded))
}

/// Statistics accumulated over every shader compiled by a session.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Shaders compiled successfully.
    pub shaders_compiled: usize,

    /// Shaders rejected by allocation or encoding.
    pub shaders_failed: usize,

    pub instructions_encoded: usize,

    /// Total stream size including padding (bytes).
    pub bytes_emitted: usize,

    pub padding_bytes: usize,

    /// Virtual registers allocated.
    pub virtual_registers: usize,

    pub interference_edges: usize,

    /// Per-class maximum over all shaders.
    pub registers_used: RegisterUsage,

    /// Count of each opcode encoded.
    pub opcode_counts: HashMap<Opcode, usize>,

    /// Largest arena footprint of a single shader (bytes).
    pub peak_arena_bytes: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compile Session Statistics:")?;
        writeln!(f, "  Shaders compiled: {}", self.shaders_compiled)?;
        writeln!(f, "  Shaders failed: {}", self.shaders_failed)?;
        writeln!(f, "  Instructions encoded: {}", self.instructions_encoded)?;
        writeln!(
            f,
            "  Code emitted: {} bytes ({} padding)",
            self.bytes_emitted, self.padding_bytes
        )?;
        writeln!(f, "  Virtual registers: {}", self.virtual_registers)?;
        writeln!(f, "  Interference edges: {}", self.interference_edges)?;
        writeln!(f, "  Registers used: {}", self.registers_used)?;
        writeln!(f, "  Peak arena: {} bytes", self.peak_arena_bytes)?;

        if !self.opcode_counts.is_empty() {
            writeln!(f, "  Opcode breakdown:")?;
            let mut sorted: Vec<_> = self.opcode_counts.iter().collect();
            sorted.sort_by_key(|(op, count)| (std::cmp::Reverse(**count), op.name()));

            for (opcode, count) in sorted {
                writeln!(f, "    {}: {}", opcode, count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{CompileError, RegAllocError};
    use crate::core::shader::{Instruction, Operand};
    use crate::regalloc::RegClass;

    fn small_fragment() -> Shader {
        let mut shader = Shader::new(ShaderStage::Fragment);
        shader
            .push(Instruction::new(Opcode::MovImm, [Operand::vtemp(0), Operand::imm(5)]))
            .push(Instruction::new(
                Opcode::Fma,
                [
                    Operand::vtemp(1),
                    Operand::vtemp(0),
                    Operand::vtemp(0),
                    Operand::vtemp(0),
                ],
            ))
            .push(Instruction::new(Opcode::EndFrag, []));
        shader
    }

    #[test]
    fn test_compile_session_creation() {
        let session = CompileSession::new();
        let stats = session.stats();
        assert_eq!(stats.shaders_compiled, 0);
        assert_eq!(stats.instructions_encoded, 0);
        assert!(stats.opcode_counts.is_empty());
    }

    #[test]
    fn test_compile_records_statistics() {
        let _ = env_logger::builder().is_test(true).try_init();
        let classes = RegisterClassSet::rogue();
        let mut session = CompileSession::new();

        let mut shader = small_fragment();
        let binary = session.compile(&classes, &mut shader).unwrap();
        assert!(shader.is_allocated());
        assert_eq!(binary.stage, ShaderStage::Fragment);
        assert_eq!(binary.code.len(), 48);
        assert_eq!(binary.padding, 8);
        assert_eq!(binary.code_len(), 40);
        assert_eq!(binary.usage.temps(), 2);

        let mut again = small_fragment();
        session.compile(&classes, &mut again).unwrap();

        let stats = session.stats();
        assert_eq!(stats.shaders_compiled, 2);
        assert_eq!(stats.instructions_encoded, 6);
        assert_eq!(stats.bytes_emitted, 96);
        assert_eq!(stats.padding_bytes, 16);
        assert_eq!(stats.virtual_registers, 4);
        assert_eq!(stats.interference_edges, 2);
        assert_eq!(stats.registers_used.get(RegClass::Temp), 2);
        assert_eq!(stats.opcode_counts.get(&Opcode::Fma), Some(&2));
        assert!(stats.peak_arena_bytes > 0);
    }

    #[test]
    fn test_failure_is_counted() {
        let classes = RegisterClassSet::with_counts(1, 4).unwrap();
        let mut session = CompileSession::new();
        let mut shader = small_fragment();
        let before = shader.clone();

        let err = session.compile(&classes, &mut shader).unwrap_err();
        assert!(matches!(
            err,
            CompileError::RegAlloc(RegAllocError::AllocationFailure {
                class: RegClass::Temp,
                ..
            })
        ));
        assert_eq!(shader, before);
        assert_eq!(session.stats().shaders_failed, 1);
        assert_eq!(session.stats().shaders_compiled, 0);
    }

    #[test]
    fn test_empty_shader_encodes_to_nothing() {
        let classes = RegisterClassSet::rogue();
        let mut session = CompileSession::new();
        let mut shader = Shader::new(ShaderStage::Vertex);
        let binary = session.compile(&classes, &mut shader).unwrap();
        assert!(binary.code.is_empty());
        assert_eq!(binary.padding, 0);
        assert_eq!(binary.usage, RegisterUsage::default());
    }

    #[test]
    fn test_session_statistics_display() {
        let classes = RegisterClassSet::rogue();
        let mut session = CompileSession::default();
        let mut shader = small_fragment();
        session.compile(&classes, &mut shader).unwrap();

        let text = session.stats().to_string();
        assert!(text.contains("Shaders compiled: 1"));
        assert!(text.contains("Code emitted: 48 bytes (8 padding)"));
        assert!(text.contains("Registers used: temps: 2, internals: 0"));
        assert!(text.contains("    fma: 1"));
    }
}
