//! In-memory SPIR-V module builder and binary emitter.
//!
//! A [`Module`] owns an arena of [`Instruction`](instr::Instruction)s and
//! [`BasicBlockData`](block::BasicBlockData)s; everything else (types,
//! constants, functions, blocks) is a [`InstrId`](id::InstrId)/
//! [`BlockId`](id::BlockId) into one of those arenas. Types and constants
//! are interned by structural equality, so building the same `Type` or
//! `Constant` twice returns the same id. [`Module::write`] serializes the
//! whole module to a binary word stream via the [`Writer`](writer::Writer)
//! trait, assigning result ids lazily in first-reference order.
//!
//! ```no_run
//! use spvbuild::module::{make_version, Module};
//! use spvbuild::writer::VecWriter;
//! use spirv::{AddressingModel, Capability, MemoryModel};
//!
//! let mut module = Module::new(make_version(1, 3));
//! module.add_capability(Capability::Shader);
//! module.set_memory_model(AddressingModel::Logical, MemoryModel::GLSL450);
//! let mut sink = VecWriter::new();
//! module.write(&mut sink).unwrap();
//! ```
pub mod block;
pub mod constant;
pub mod control_flow;
pub mod error;
pub mod ext_inst;
pub mod func;
pub mod id;
pub mod infer;
pub mod instr;
pub mod logger;
pub mod module;
pub mod operand;
pub mod ty;
pub mod writer;

pub use error::{BuildError, BuildResult};
pub use id::{BlockId, EpId, FuncHandle, FuncId, InstrId};
pub use instr::Instruction;
pub use module::{make_version, BlockCursor, Module};
