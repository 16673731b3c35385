//! A basic block: a label, an ordered instruction list, and the merge
//! metadata the structured control-flow builders attach before the
//! terminal branch.
use crate::id::{BlockId, InstrId};
use crate::instr::Instruction;

#[derive(Debug, Clone)]
pub struct BasicBlockData {
    pub label: InstrId,
    pub instrs: Vec<InstrId>,
    /// Set by `Module::build_if`/`build_loop`/`build_switch` for the header
    /// block of a structured construct.
    pub merge: Option<BlockId>,
    /// Set only for loop headers; the continue-target block.
    pub cont: Option<BlockId>,
}

impl BasicBlockData {
    pub fn new(label: InstrId) -> Self {
        BasicBlockData {
            label,
            instrs: Vec::new(),
            merge: None,
            cont: None,
        }
    }

    /// The block's terminal instruction, if it has one: that's the last
    /// instruction in the list *and* its opcode is actually a terminator.
    /// A block whose last instruction is non-terminal (the caller never
    /// closed it) returns `None`, same as an empty block.
    pub fn terminator(&self, instrs: &[Instruction]) -> Option<InstrId> {
        let last = *self.instrs.last()?;
        if instrs[last.index()].is_terminal() {
            Some(last)
        } else {
            None
        }
    }

    pub fn is_terminated(&self, instrs: &[Instruction]) -> bool {
        self.terminator(instrs).is_some()
    }
}
