//! Function and entry-point records. Grounded on
//! `spirq/src/entry_point.rs`'s `EntryPoint` field shape and
//! `original_source/lib/source/Module.cpp::write`'s entry-point interface
//! finalization loop.
pub use spirv::{ExecutionModel, FunctionControl};

use crate::id::{BlockId, InstrId};
use crate::ty::Type;

#[derive(Debug, Clone)]
pub struct Function {
    pub ret_ty: Type,
    pub param_tys: Vec<Type>,
    /// The interned `OpTypeFunction` instruction for `(ret_ty, param_tys)`.
    pub fn_ty: InstrId,
    pub control: FunctionControl,
    /// The `OpFunction` instruction itself; its result id names the
    /// function everywhere else (calls, entry points).
    pub def: InstrId,
    pub params: Vec<InstrId>,
    /// Basic blocks in emission order; `blocks[0]` is the entry block.
    pub blocks: Vec<BlockId>,
}

impl Function {
    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }
    pub fn is_declaration_only(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// An entry point. `original_source`'s `EntryPoint` is a `Function`
/// subtype stored in its own section rather than a plain `Function`
/// referenced from `OpEntryPoint`, so it owns its `Function` outright
/// instead of pointing at one in `Module::functions`.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub exec_model: ExecutionModel,
    pub name: String,
    pub function: Function,
    pub exec_modes: Vec<InstrId>,
    /// Finalized lazily by `Module::write`, once the whole function body is
    /// known: the unique non-function-storage `OpVariable`s reachable from
    /// this entry point's blocks.
    pub interface: Vec<InstrId>,
}
