//! GLSL.std.450 extended-instruction opcodes. Per spec.md §9's design note,
//! the dozens of named wrappers are generated from one table instead of
//! hand-written one by one; `Module`/`BlockCursor` expose the generic
//! `ext_inst` call plus the wrappers this macro produces.

/// GLSL.std.450 opcode values, from the Khronos extended instruction set
/// specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[non_exhaustive]
pub enum GlslExtInst {
    Round = 1,
    RoundEven = 2,
    Trunc = 3,
    FAbs = 4,
    SAbs = 5,
    FSign = 6,
    SSign = 7,
    Floor = 8,
    Ceil = 9,
    Fract = 10,
    Sin = 13,
    Cos = 14,
    Tan = 15,
    Pow = 26,
    Exp = 27,
    Log = 28,
    Exp2 = 29,
    Log2 = 30,
    Sqrt = 31,
    InverseSqrt = 32,
    FMin = 37,
    UMin = 38,
    SMin = 39,
    FMax = 40,
    UMax = 41,
    SMax = 42,
    FClamp = 43,
    UClamp = 44,
    SClamp = 45,
    FMix = 46,
    Step = 48,
    SmoothStep = 49,
    Fma = 50,
    Length = 66,
    Distance = 67,
    Cross = 68,
    Normalize = 69,
    FaceForward = 70,
    Reflect = 71,
    Refract = 72,
}

/// Generates `$name(&mut self, set: InstrId, ret_ty: InstrId, $($arg: InstrId),*) -> InstrId`
/// wrapper methods on whatever `impl` block this macro is invoked inside,
/// each a thin call into `self.ext_inst(set, GlslExtInst::$op as u32, ret_ty, vec![$($arg),*])`.
#[macro_export]
macro_rules! glsl_ext_inst_wrappers {
    ($($name:ident => $op:ident ( $($arg:ident),* ),)+) => {
        $(
            pub fn $name(
                &mut self,
                set: $crate::id::InstrId,
                ret_ty: $crate::id::InstrId,
                $($arg: $crate::id::InstrId),*
            ) -> $crate::id::InstrId {
                self.ext_inst(
                    set,
                    $crate::ext_inst::GlslExtInst::$op as u32,
                    ret_ty,
                    vec![$($arg),*],
                )
            }
        )+
    };
}
