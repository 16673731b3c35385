//! Constant and specialization-constant records, interned the same way
//! `Type` is. See `original_source/lib/include/spvgentwo/Constant.h` for the
//! operation this mirrors (`Constant::make`) and
//! `spirq-core/src/constant.rs` for the `ConstantValue` shape this reuses.
use half::f16;
use ordered_float::OrderedFloat;

use crate::ty::Type;

/// Literal payload of a scalar constant. Hashable and `Eq` so it can key an
/// interning map, unlike a bare `f32`/`f64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Bool(bool),
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F16(OrderedFloat<f16>),
    F32(OrderedFloat<f32>),
    F64(OrderedFloat<f64>),
}
impl From<bool> for ConstantValue {
    fn from(x: bool) -> Self {
        ConstantValue::Bool(x)
    }
}
impl From<i32> for ConstantValue {
    fn from(x: i32) -> Self {
        ConstantValue::S32(x)
    }
}
impl From<u32> for ConstantValue {
    fn from(x: u32) -> Self {
        ConstantValue::U32(x)
    }
}
impl From<i64> for ConstantValue {
    fn from(x: i64) -> Self {
        ConstantValue::S64(x)
    }
}
impl From<u64> for ConstantValue {
    fn from(x: u64) -> Self {
        ConstantValue::U64(x)
    }
}
impl From<f32> for ConstantValue {
    fn from(x: f32) -> Self {
        ConstantValue::F32(OrderedFloat(x))
    }
}
impl From<f64> for ConstantValue {
    fn from(x: f64) -> Self {
        ConstantValue::F64(OrderedFloat(x))
    }
}

impl ConstantValue {
    /// Split this value into the 32-bit little-endian words the SPIR-V
    /// grammar expects for the literal operand of `OpConstant`: one word for
    /// anything that fits in 32 bits, two words low-word-first for 64-bit
    /// scalars.
    pub fn to_words(&self) -> Vec<u32> {
        match self {
            ConstantValue::Bool(x) => vec![*x as u32],
            ConstantValue::S8(x) => vec![*x as i32 as u32],
            ConstantValue::S16(x) => vec![*x as i32 as u32],
            ConstantValue::S32(x) => vec![*x as u32],
            ConstantValue::U8(x) => vec![*x as u32],
            ConstantValue::U16(x) => vec![*x as u32],
            ConstantValue::U32(x) => vec![*x],
            ConstantValue::F16(x) => vec![x.0.to_bits() as u32],
            ConstantValue::F32(x) => vec![x.0.to_bits()],
            ConstantValue::S64(x) => {
                let bits = *x as u64;
                vec![bits as u32, (bits >> 32) as u32]
            }
            ConstantValue::U64(x) => vec![*x as u32, (*x >> 32) as u32],
            ConstantValue::F64(x) => {
                let bits = x.0.to_bits();
                vec![bits as u32, (bits >> 32) as u32]
            }
        }
    }

    pub fn ty(&self) -> Type {
        match self {
            ConstantValue::Bool(_) => Type::Bool,
            ConstantValue::S8(_) => Type::int(8),
            ConstantValue::S16(_) => Type::int(16),
            ConstantValue::S32(_) => Type::int(32),
            ConstantValue::S64(_) => Type::int(64),
            ConstantValue::U8(_) => Type::uint(8),
            ConstantValue::U16(_) => Type::uint(16),
            ConstantValue::U32(_) => Type::uint(32),
            ConstantValue::U64(_) => Type::uint(64),
            ConstantValue::F16(_) => Type::float(16),
            ConstantValue::F32(_) => Type::float(32),
            ConstantValue::F64(_) => Type::float(64),
        }
    }
}

/// Sampler address/coordinate/filter mode triple for `OpConstantSampler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerModes {
    pub addressing_mode: u32,
    pub normalized: bool,
    pub filter_mode: u32,
}

/// Shape of the constant, independent of its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantData {
    True,
    False,
    Null,
    Scalar(ConstantValue),
    Composite(Vec<Constant>),
    Sampler(SamplerModes),
}

/// Specialization-constant identity. Not an instruction id: it's the
/// `SpecId` decoration value host code uses to target a spec constant at
/// pipeline-creation time.
pub type SpecId = u32;

/// A constant or specialization constant, structurally described. Equality
/// (hence interning) is fully recursive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    pub ty: Type,
    pub data: ConstantData,
    pub is_spec: bool,
    pub spec_id: Option<SpecId>,
}

impl Constant {
    pub fn scalar(value: impl Into<ConstantValue>) -> Constant {
        let value = value.into();
        Constant {
            ty: value.ty(),
            data: ConstantData::Scalar(value),
            is_spec: false,
            spec_id: None,
        }
    }
    pub fn bool(value: bool) -> Constant {
        Constant {
            ty: Type::Bool,
            data: if value {
                ConstantData::True
            } else {
                ConstantData::False
            },
            is_spec: false,
            spec_id: None,
        }
    }
    pub fn null(ty: Type) -> Constant {
        Constant {
            ty,
            data: ConstantData::Null,
            is_spec: false,
            spec_id: None,
        }
    }
    pub fn composite(ty: Type, components: Vec<Constant>) -> Constant {
        Constant {
            ty,
            data: ConstantData::Composite(components),
            is_spec: false,
            spec_id: None,
        }
    }
    pub fn sampler(modes: SamplerModes) -> Constant {
        Constant {
            ty: crate::ty::Type::Sampler,
            data: ConstantData::Sampler(modes),
            is_spec: false,
            spec_id: None,
        }
    }

    /// Turn this constant into its specialization-constant counterpart,
    /// tagged with the `SpecId` the host will use to override it. Mirrors
    /// `Constant::make(..., _spec = true)` in the original source, which
    /// builds runtime and spec constants from the same call shape.
    pub fn into_spec(mut self, spec_id: SpecId) -> Constant {
        self.is_spec = true;
        self.spec_id = Some(spec_id);
        self
    }

    /// The `spv::Op` this constant interns to.
    pub fn opcode(&self) -> spirv::Op {
        use spirv::Op;
        match (&self.data, self.is_spec) {
            (ConstantData::True, false) => Op::ConstantTrue,
            (ConstantData::True, true) => Op::SpecConstantTrue,
            (ConstantData::False, false) => Op::ConstantFalse,
            (ConstantData::False, true) => Op::SpecConstantFalse,
            (ConstantData::Null, _) => Op::ConstantNull,
            (ConstantData::Scalar(_), false) => Op::Constant,
            (ConstantData::Scalar(_), true) => Op::SpecConstant,
            (ConstantData::Composite(_), false) => Op::ConstantComposite,
            (ConstantData::Composite(_), true) => Op::SpecConstantComposite,
            (ConstantData::Sampler(_), _) => Op::ConstantSampler,
        }
    }
}
