//! Structured control-flow builders. Each one lays out the blocks a
//! construct needs and attaches the `OpSelectionMerge`/`OpLoopMerge`
//! instruction as the second-to-last instruction of its header block, right
//! before the terminal branch — the ordering SPIR-V's structured control
//! flow rules require and `original_source`'s block builders enforce by
//! construction rather than by a later validation pass.
use spirv::{LoopControl, Op, SelectionControl};

use crate::id::{BlockId, FuncHandle};
use crate::instr::Instruction;
use crate::module::Module;

/// Blocks created by `Module::build_if`. `else_block` is `None` when the
/// construct has no else arm, in which case the false edge of the
/// conditional branch targets `merge_block` directly.
pub struct IfBuilder {
    pub then_block: BlockId,
    pub else_block: Option<BlockId>,
    pub merge_block: BlockId,
}

/// Blocks created by `Module::build_loop`. The header's own terminator
/// (`OpLoopMerge` + branch into `body`) is left to `Module::close_loop_header`
/// so callers can first emit whatever condition check the header needs.
pub struct LoopBuilder {
    pub header: BlockId,
    pub body: BlockId,
    pub continue_block: BlockId,
    pub merge_block: BlockId,
}

/// Blocks created by `Module::build_switch`, one per case value in the same
/// order as the `case_values` slice passed in.
pub struct SwitchBuilder {
    pub cases: Vec<(u32, BlockId)>,
    pub default: BlockId,
    pub merge_block: BlockId,
}

impl Module {
    /// Lay out an if/else(if)/merge construct and terminate `header` with
    /// `OpSelectionMerge` + `OpBranchConditional`. `cond` must already be a
    /// bool-typed value computed in `header`.
    pub fn build_if(
        &mut self,
        func: impl Into<FuncHandle>,
        header: BlockId,
        cond: crate::id::InstrId,
        has_else: bool,
    ) -> IfBuilder {
        let func = func.into();
        let then_block = self.add_block(func);
        let else_block = if has_else { Some(self.add_block(func)) } else { None };
        let merge_block = self.add_block(func);
        self.block_data_mut(header).merge = Some(merge_block);

        let mut merge_instr = Instruction::new(Op::SelectionMerge);
        merge_instr
            .add_operand_block(merge_block)
            .add_operand_literal(SelectionControl::NONE.bits());
        let merge_id = self.push_instr(merge_instr);
        self.block_data_mut(header).instrs.push(merge_id);

        let false_target = else_block.unwrap_or(merge_block);
        let mut branch_instr = Instruction::new(Op::BranchConditional);
        branch_instr
            .add_operand(cond)
            .add_operand_block(then_block)
            .add_operand_block(false_target);
        let branch_id = self.push_instr(branch_instr);
        self.block_data_mut(header).instrs.push(branch_id);

        IfBuilder {
            then_block,
            else_block,
            merge_block,
        }
    }

    /// Create the four blocks a structured loop needs (header, body,
    /// continue target, merge). The header is left open so the caller can
    /// emit its condition check via `cursor(lb.header)` before closing it
    /// with `close_loop_header`.
    pub fn build_loop(&mut self, func: impl Into<FuncHandle>) -> LoopBuilder {
        let func = func.into();
        let header = self.add_block(func);
        let body = self.add_block(func);
        let continue_block = self.add_block(func);
        let merge_block = self.add_block(func);
        self.block_data_mut(header).merge = Some(merge_block);
        self.block_data_mut(header).cont = Some(continue_block);
        LoopBuilder {
            header,
            body,
            continue_block,
            merge_block,
        }
    }

    /// Terminate a loop header with `OpLoopMerge` + an unconditional branch
    /// to `branch_target` (typically a condition-check block that in turn
    /// branches into `lb.body` or `lb.merge_block`).
    pub fn close_loop_header(&mut self, lb: &LoopBuilder, branch_target: BlockId) {
        let mut merge_instr = Instruction::new(Op::LoopMerge);
        merge_instr
            .add_operand_block(lb.merge_block)
            .add_operand_block(lb.continue_block)
            .add_operand_literal(LoopControl::NONE.bits());
        let merge_id = self.push_instr(merge_instr);
        self.block_data_mut(lb.header).instrs.push(merge_id);

        let mut branch_instr = Instruction::new(Op::Branch);
        branch_instr.add_operand_block(branch_target);
        let branch_id = self.push_instr(branch_instr);
        self.block_data_mut(lb.header).instrs.push(branch_id);
    }

    /// Lay out a switch construct and terminate `header` with
    /// `OpSelectionMerge` + `OpSwitch`. One block is created per entry in
    /// `case_values`, in order, plus a default block and a merge block.
    pub fn build_switch(
        &mut self,
        func: impl Into<FuncHandle>,
        header: BlockId,
        selector: crate::id::InstrId,
        case_values: &[u32],
    ) -> SwitchBuilder {
        let func = func.into();
        let cases: Vec<(u32, BlockId)> = case_values.iter().map(|&v| (v, self.add_block(func))).collect();
        let default = self.add_block(func);
        let merge_block = self.add_block(func);
        self.block_data_mut(header).merge = Some(merge_block);

        let mut merge_instr = Instruction::new(Op::SelectionMerge);
        merge_instr
            .add_operand_block(merge_block)
            .add_operand_literal(SelectionControl::NONE.bits());
        let merge_id = self.push_instr(merge_instr);
        self.block_data_mut(header).instrs.push(merge_id);

        let mut switch_instr = Instruction::new(Op::Switch);
        switch_instr.add_operand(selector).add_operand_block(default);
        for &(v, b) in &cases {
            switch_instr.add_operand_literal(v).add_operand_block(b);
        }
        let switch_id = self.push_instr(switch_instr);
        self.block_data_mut(header).instrs.push(switch_id);

        SwitchBuilder {
            cases,
            default,
            merge_block,
        }
    }
}
