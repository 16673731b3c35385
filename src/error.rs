//! Error infrastructure. Internal fallible helpers use `anyhow`, the way
//! `spirq-core::error` does; the emitter's own failure modes are a closed,
//! typed enum so callers can match on them.
use std::fmt;

pub use anyhow::{anyhow, Error, Result};

/// Failure modes `Module::write`/`Module::validate` can report. Each
/// corresponds to one bullet of spec.md §4.7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A basic block had no terminal instruction at emission time.
    UnterminatedBlock,
    /// An operand referenced an instruction whose id was never assigned
    /// (it was never reached during the id-assignment pre-pass).
    DanglingId,
    /// The constant/type carries an opcode this emitter does not encode
    /// (currently only `OpSpecConstantOp`).
    UnimplementedOpcode(&'static str),
    /// An entry point's global interface could not be finalized because a
    /// referenced variable was not found in any section. The original
    /// (pointer-and-lookup-table) implementation this mirrors can fail this
    /// way; this crate's arena model cannot, since every `InstrId` reaching
    /// `Module::finalize_interface` is by construction a valid index into
    /// `Module`'s own instruction arena. Kept for API parity with that
    /// failure mode rather than left unreachable by a caller matching on
    /// `BuildError`.
    MissingInterfaceVariable,
    /// A previous fatal error poisoned the module; `write` refuses to run
    /// again until the module is rebuilt.
    Poisoned,
}
impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::UnterminatedBlock => write!(f, "basic block has no terminator"),
            BuildError::DanglingId => write!(f, "operand references an unassigned result id"),
            BuildError::UnimplementedOpcode(op) => write!(f, "opcode not implemented: {op}"),
            BuildError::MissingInterfaceVariable => {
                write!(f, "entry point interface variable not found")
            }
            BuildError::Poisoned => write!(f, "module is poisoned by a prior fatal error"),
        }
    }
}
impl std::error::Error for BuildError {}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
