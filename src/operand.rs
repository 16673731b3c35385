//! Tagged operand values carried by instructions, mirroring
//! `spirq-core::parse::instr::Operands` in reverse: that reader peels words
//! off a binary; this is what gets pushed back on.
use crate::id::{BlockId, InstrId};

/// One operand slot of an `Instruction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Reference to another instruction's result id (an SSA use, or a type
    /// reference).
    Instr(InstrId),
    /// A raw, already-known numeric id that isn't backed by an arena entry
    /// (e.g. a decoration target supplied by the caller out of band).
    RawId(u32),
    /// Reference to a basic block (branch target).
    Block(BlockId),
    /// One 32-bit literal word.
    Literal(u32),
}

impl Operand {
    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }
}

impl From<InstrId> for Operand {
    fn from(x: InstrId) -> Self {
        Operand::Instr(x)
    }
}
impl From<BlockId> for Operand {
    fn from(x: BlockId) -> Self {
        Operand::Block(x)
    }
}
