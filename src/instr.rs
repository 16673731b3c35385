//! One SPIR-V opcode, its operand sequence, and its lazy result id.
//! Word-count/header convention mirrors
//! `spirq-core::parse::instr::InstructionBuilder`, reimplemented without the
//! `unsafe` pointer cast that builder used for string packing (its own
//! `FIXME` asks for exactly that).
use spirv::Op;

use crate::id::{BlockId, InstrId};
use crate::operand::Operand;

/// An instruction that has not yet been (or never will be) placed in a
/// section. Construction and interning/placement are separate steps:
/// `Module` pushes these into its instruction arena and records the
/// resulting `InstrId`.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Op,
    pub result_type: Option<InstrId>,
    has_result_id: bool,
    result_id: u32,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(opcode: Op) -> Self {
        Instruction {
            opcode,
            result_type: None,
            has_result_id: false,
            result_id: 0,
            operands: Vec::new(),
        }
    }

    /// Build an instruction that carries a result id but no result type
    /// (e.g. `OpLabel`, `OpExtInstImport`).
    pub fn new_with_id(opcode: Op) -> Self {
        let mut instr = Self::new(opcode);
        instr.has_result_id = true;
        instr
    }

    /// Build an instruction that carries both a result type and a result id
    /// (the common case for value-producing instructions).
    pub fn new_typed(opcode: Op, result_type: InstrId) -> Self {
        let mut instr = Self::new_with_id(opcode);
        instr.result_type = Some(result_type);
        instr
    }

    pub fn set_opcode(&mut self, opcode: Op) -> &mut Self {
        self.opcode = opcode;
        self
    }
    pub fn set_result_type(&mut self, ty: InstrId) -> &mut Self {
        self.result_type = Some(ty);
        self.has_result_id = true;
        self
    }
    pub fn grant_result_id(&mut self) -> &mut Self {
        self.has_result_id = true;
        self
    }

    pub fn has_result_id(&self) -> bool {
        self.has_result_id
    }
    pub fn result_id(&self) -> u32 {
        self.result_id
    }

    pub fn add_operand(&mut self, op: impl Into<Operand>) -> &mut Self {
        self.operands.push(op.into());
        self
    }
    pub fn add_operand_raw_id(&mut self, id: u32) -> &mut Self {
        self.operands.push(Operand::RawId(id));
        self
    }
    pub fn add_operand_literal(&mut self, word: u32) -> &mut Self {
        self.operands.push(Operand::Literal(word));
        self
    }
    pub fn add_operand_block(&mut self, block: BlockId) -> &mut Self {
        self.operands.push(Operand::Block(block));
        self
    }

    /// Append a host value as consecutive little-endian literal words,
    /// matching the width the SPIR-V grammar assigns to that operand kind:
    /// one word for anything `<= 32` bits, two words low-word-first for
    /// 64-bit scalars.
    pub fn append_literals(&mut self, words: impl IntoLiteralWords) -> &mut Self {
        for w in words.into_literal_words() {
            self.operands.push(Operand::Literal(w));
        }
        self
    }

    /// Pack a UTF-8 string as little-endian words, NUL-terminated and
    /// zero-padded to a word boundary, per the SPIR-V literal string rule.
    pub fn append_str(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        let mut word = 0u32;
        let mut shift = 0u32;
        for &b in bytes {
            word |= (b as u32) << shift;
            shift += 8;
            if shift == 32 {
                self.operands.push(Operand::Literal(word));
                word = 0;
                shift = 0;
            }
        }
        // Trailing NUL plus zero-padding always fit in the word in
        // progress: `shift` is < 32 here since a full word was flushed above.
        self.operands.push(Operand::Literal(word));
        self
    }

    pub fn word_count(&self) -> u32 {
        1 + self.result_type.is_some() as u32
            + self.has_result_id as u32
            + self.operands.len() as u32
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.opcode,
            Op::Branch
                | Op::BranchConditional
                | Op::Switch
                | Op::Return
                | Op::ReturnValue
                | Op::Unreachable
                | Op::Kill
                | Op::TerminateInvocation
        )
    }

    /// Assign the next id to this instruction if it hasn't been assigned
    /// yet, and return it. Instructions with no result-id slot return 0.
    pub fn assign_id(&mut self, counter: &mut crate::id::IdCounter) -> u32 {
        if !self.has_result_id {
            return 0;
        }
        if self.result_id == 0 {
            self.result_id = counter.next();
        }
        self.result_id
    }
}

/// Host values that can be exploded into 32-bit little-endian literal
/// words for an instruction's literal operand.
pub trait IntoLiteralWords {
    fn into_literal_words(self) -> Vec<u32>;
}
macro_rules! impl_into_literal_words_32 {
    ($($t:ty),+) => {
        $(
            impl IntoLiteralWords for $t {
                fn into_literal_words(self) -> Vec<u32> {
                    vec![self as u32]
                }
            }
        )+
    };
}
impl_into_literal_words_32!(bool, u8, u16, u32, i8, i16, i32);
impl IntoLiteralWords for f32 {
    fn into_literal_words(self) -> Vec<u32> {
        vec![self.to_bits()]
    }
}
impl IntoLiteralWords for u64 {
    fn into_literal_words(self) -> Vec<u32> {
        vec![self as u32, (self >> 32) as u32]
    }
}
impl IntoLiteralWords for i64 {
    fn into_literal_words(self) -> Vec<u32> {
        (self as u64).into_literal_words()
    }
}
impl IntoLiteralWords for f64 {
    fn into_literal_words(self) -> Vec<u32> {
        self.to_bits().into_literal_words()
    }
}
