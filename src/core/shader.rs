// This module defines the per-instruction representation shared by the register allocator
// and the instruction encoder. An Operand is an exhaustive sum type: an immediate, a
// dependent read counter (DRC) index, a physical register (bank + number) or a virtual
// register (index + optional vector component). Illegal pairings such as a DRC with a bank
// field cannot be expressed. Instructions carry a closed Opcode, a fixed-length operand
// list and a closed flag set (saturate, low precision, overlap check). Shaders are ordered
// instruction lists whose iteration order defines program position. Before allocation every
// allocatable register operand is Virtual; after allocation every one of them is Physical.

//! Shader instruction data model.

use std::fmt;

/// Number of dependent read counters exposed by the hardware.
pub const NUM_DRCS: u8 = 2;

/// Register banks exposed by the ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegBank {
    Temp,
    Coeff,
    Const,
    Shared,
    PixelOut,
    VertexIn,
    Internal,
}

impl RegBank {
    pub const ALL: [RegBank; 7] = [
        RegBank::Temp,
        RegBank::Coeff,
        RegBank::Const,
        RegBank::Shared,
        RegBank::PixelOut,
        RegBank::VertexIn,
        RegBank::Internal,
    ];

    /// Assembly prefix used when printing registers of this bank.
    pub fn prefix(self) -> &'static str {
        match self {
            RegBank::Temp => "r",
            RegBank::Coeff => "cf",
            RegBank::Const => "sc",
            RegBank::Shared => "sh",
            RegBank::PixelOut => "o",
            RegBank::VertexIn => "vi",
            RegBank::Internal => "i",
        }
    }
}

/// Dependent read counter index, always below [`NUM_DRCS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Drc(u8);

impl Drc {
    pub const fn new(index: u8) -> Option<Self> {
        if index < NUM_DRCS {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

/// A hardware register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysReg {
    pub bank: RegBank,
    pub number: u32,
}

impl PhysReg {
    pub const fn new(bank: RegBank, number: u32) -> Self {
        Self { bank, number }
    }
}

/// Which part of a vector register group an operand reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// The whole group.
    All,
    /// A single lane of the group.
    Lane(u8),
}

/// A register awaiting allocation.
///
/// `vector` is `None` for scalar temporaries and `Some` for registers that
/// live in an aligned vector group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtReg {
    pub index: u32,
    pub vector: Option<Component>,
}

impl VirtReg {
    pub const fn scalar(index: u32) -> Self {
        Self { index, vector: None }
    }

    pub const fn vector(index: u32, component: Component) -> Self {
        Self {
            index,
            vector: Some(component),
        }
    }

    pub fn is_vector(&self) -> bool {
        self.vector.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Immediate(u64),
    Drc(Drc),
    Physical(PhysReg),
    Virtual(VirtReg),
}

impl Operand {
    pub const fn imm(value: u64) -> Self {
        Operand::Immediate(value)
    }

    /// DRC operand, `None` when `index` is not a valid counter.
    pub const fn drc(index: u8) -> Option<Self> {
        match Drc::new(index) {
            Some(drc) => Some(Operand::Drc(drc)),
            None => None,
        }
    }

    pub const fn reg(bank: RegBank, number: u32) -> Self {
        Operand::Physical(PhysReg::new(bank, number))
    }

    pub const fn temp(number: u32) -> Self {
        Operand::reg(RegBank::Temp, number)
    }

    /// Scalar virtual register.
    pub const fn vtemp(index: u32) -> Self {
        Operand::Virtual(VirtReg::scalar(index))
    }

    /// Virtual register living in a vector group.
    pub const fn vvec(index: u32, component: Component) -> Self {
        Operand::Virtual(VirtReg::vector(index, component))
    }

    pub fn as_virtual(&self) -> Option<VirtReg> {
        match self {
            Operand::Virtual(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_physical(&self) -> Option<PhysReg> {
        match self {
            Operand::Physical(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Operand::Virtual(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(v) => write!(f, "#{v}"),
            Operand::Drc(d) => write!(f, "drc{}", d.index()),
            Operand::Physical(r) => write!(f, "{}{}", r.bank.prefix(), r.number),
            Operand::Virtual(v) => match v.vector {
                None => write!(f, "%{}", v.index),
                Some(Component::All) => write!(f, "%v{}", v.index),
                Some(Component::Lane(l)) => write!(f, "%v{}.{}", v.index, l),
            },
        }
    }
}

/// Closed opcode space of the ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Nop,
    EndFrag,
    EndVert,
    Wdf,
    PixIterW,
    Max,
    Min,
    PackU8888,
    Mov,
    MovImm,
    Fma,
    Mul,
}

impl Opcode {
    pub const ALL: [Opcode; 12] = [
        Opcode::Nop,
        Opcode::EndFrag,
        Opcode::EndVert,
        Opcode::Wdf,
        Opcode::PixIterW,
        Opcode::Max,
        Opcode::Min,
        Opcode::PackU8888,
        Opcode::Mov,
        Opcode::MovImm,
        Opcode::Fma,
        Opcode::Mul,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::EndFrag => "end.frag",
            Opcode::EndVert => "end.vert",
            Opcode::Wdf => "wdf",
            Opcode::PixIterW => "pixiter.w",
            Opcode::Max => "max",
            Opcode::Min => "min",
            Opcode::PackU8888 => "pack.u8888",
            Opcode::Mov => "mov",
            Opcode::MovImm => "movi",
            Opcode::Fma => "fma",
            Opcode::Mul => "mul",
        }
    }

    /// Fixed operand count. Operand 0 is the destination for opcodes that write one.
    pub fn num_operands(self) -> usize {
        match self {
            Opcode::Nop | Opcode::EndFrag | Opcode::EndVert => 0,
            Opcode::Wdf => 1,
            Opcode::PixIterW => 5,
            Opcode::Max | Opcode::Min | Opcode::Mul => 3,
            Opcode::PackU8888 | Opcode::Mov | Opcode::MovImm => 2,
            Opcode::Fma => 4,
        }
    }

    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrFlag {
    Saturate,
    LowPrecision,
    OverlapCheck,
}

impl InstrFlag {
    pub const ALL: [InstrFlag; 3] = [
        InstrFlag::Saturate,
        InstrFlag::LowPrecision,
        InstrFlag::OverlapCheck,
    ];

    const fn bit(self) -> u8 {
        match self {
            InstrFlag::Saturate => 1 << 0,
            InstrFlag::LowPrecision => 1 << 1,
            InstrFlag::OverlapCheck => 1 << 2,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            InstrFlag::Saturate => "sat",
            InstrFlag::LowPrecision => "lp",
            InstrFlag::OverlapCheck => "olchk",
        }
    }
}

/// Set of [`InstrFlag`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InstrFlags(u8);

impl InstrFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, flag: InstrFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: InstrFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: InstrFlag) {
        self.0 &= !flag.bit();
    }

    pub const fn with(self, flag: InstrFlag) -> Self {
        Self(self.0 | flag.bit())
    }

    pub fn iter(self) -> impl Iterator<Item = InstrFlag> {
        InstrFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub flags: InstrFlags,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: impl Into<Vec<Operand>>) -> Self {
        Self {
            opcode,
            operands: operands.into(),
            flags: InstrFlags::empty(),
        }
    }

    pub fn with_flag(mut self, flag: InstrFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn has_flag(&self, flag: InstrFlag) -> bool {
        self.flags.contains(flag)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for flag in self.flags.iter() {
            write!(f, ".{}", flag.suffix())?;
        }
        for (i, op) in self.operands.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{op}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// An ordered instruction list for one shader stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shader {
    pub stage: ShaderStage,
    pub instrs: Vec<Instruction>,
}

impl Shader {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            instrs: Vec::new(),
        }
    }

    pub fn push(&mut self, instr: Instruction) -> &mut Self {
        self.instrs.push(instr);
        self
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// True once no operand refers to a virtual register.
    pub fn is_allocated(&self) -> bool {
        self.instrs
            .iter()
            .all(|i| i.operands.iter().all(|op| !op.is_virtual()))
    }
}

impl fmt::Display for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ip, instr) in self.instrs.iter().enumerate() {
            writeln!(f, "{ip:4}: {instr}")?;
        }
        Ok(())
    }
}
