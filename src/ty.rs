//! Structural description of a SPIR-V type, and the per-opcode operand
//! layout used to intern one into an `OpType*` instruction.
use std::fmt;

pub use spirv::{AccessQualifier, Dim, ImageFormat, StorageClass};

/// A SPIR-V type, described structurally rather than by id. Two `Type`
/// values that compare equal always intern to the same instruction; this is
/// the whole of `Module::add_type`'s deduplication contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Type {
    Void,
    Bool,
    Int {
        width: u32,
        is_signed: bool,
    },
    Float {
        width: u32,
    },
    Vector {
        elem: Box<Type>,
        count: u32,
    },
    Matrix {
        column: Box<Type>,
        count: u32,
    },
    Image {
        sampled_ty: Box<Type>,
        dim: Dim,
        depth: u32,
        arrayed: u32,
        ms: u32,
        sampled: u32,
        format: ImageFormat,
        access: Option<AccessQualifier>,
    },
    Sampler,
    SampledImage {
        image_ty: Box<Type>,
    },
    Array {
        elem: Box<Type>,
        length: u32,
    },
    RuntimeArray {
        elem: Box<Type>,
    },
    Struct {
        members: Vec<Type>,
    },
    Pointer {
        storage_class: StorageClass,
        pointee: Box<Type>,
    },
    /// Used only when the pointee is emitted after the pointer, via
    /// `Module::forward_declare_pointer`.
    ForwardPointer {
        storage_class: StorageClass,
        pointee: Box<Type>,
    },
    Function {
        ret: Box<Type>,
        params: Vec<Type>,
    },
    Event,
    DeviceEvent,
    ReserveId,
    Queue,
    PipeStorage,
    NamedBarrier,
    AccelStruct,
    RayQuery,
}

impl Type {
    pub fn int(width: u32) -> Type {
        Type::Int {
            width,
            is_signed: true,
        }
    }
    pub fn uint(width: u32) -> Type {
        Type::Int {
            width,
            is_signed: false,
        }
    }
    pub fn float(width: u32) -> Type {
        Type::Float { width }
    }
    pub fn vector(elem: Type, count: u32) -> Type {
        Type::Vector {
            elem: Box::new(elem),
            count,
        }
    }
    pub fn matrix(column: Type, count: u32) -> Type {
        Type::Matrix {
            column: Box::new(column),
            count,
        }
    }
    pub fn array(elem: Type, length: u32) -> Type {
        Type::Array {
            elem: Box::new(elem),
            length,
        }
    }
    pub fn runtime_array(elem: Type) -> Type {
        Type::RuntimeArray {
            elem: Box::new(elem),
        }
    }
    pub fn pointer(storage_class: StorageClass, pointee: Type) -> Type {
        Type::Pointer {
            storage_class,
            pointee: Box::new(pointee),
        }
    }
    pub fn func(ret: Type, params: Vec<Type>) -> Type {
        Type::Function {
            ret: Box::new(ret),
            params,
        }
    }

    /// Opcode that the interned instruction for this type will carry.
    pub fn opcode(&self) -> spirv::Op {
        use spirv::Op;
        match self {
            Type::Void => Op::TypeVoid,
            Type::Bool => Op::TypeBool,
            Type::Int { .. } => Op::TypeInt,
            Type::Float { .. } => Op::TypeFloat,
            Type::Vector { .. } => Op::TypeVector,
            Type::Matrix { .. } => Op::TypeMatrix,
            Type::Image { .. } => Op::TypeImage,
            Type::Sampler => Op::TypeSampler,
            Type::SampledImage { .. } => Op::TypeSampledImage,
            Type::Array { .. } => Op::TypeArray,
            Type::RuntimeArray { .. } => Op::TypeRuntimeArray,
            Type::Struct { .. } => Op::TypeStruct,
            Type::Pointer { .. } => Op::TypePointer,
            Type::ForwardPointer { .. } => Op::TypeForwardPointer,
            Type::Function { .. } => Op::TypeFunction,
            Type::Event => Op::TypeEvent,
            Type::DeviceEvent => Op::TypeDeviceEvent,
            Type::ReserveId => Op::TypeReserveId,
            Type::Queue => Op::TypeQueue,
            Type::PipeStorage => Op::TypePipeStorage,
            Type::NamedBarrier => Op::TypeNamedBarrier,
            Type::AccelStruct => Op::TypeAccelerationStructureKHR,
            Type::RayQuery => Op::TypeRayQueryKHR,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Bool => f.write_str("bool"),
            Type::Int { width, is_signed } => {
                write!(f, "{}{width}", if *is_signed { "i" } else { "u" })
            }
            Type::Float { width } => write!(f, "f{width}"),
            Type::Vector { elem, count } => write!(f, "vec{count}<{elem}>"),
            Type::Matrix { column, count } => write!(f, "mat{count}x<{column}>"),
            Type::Image { .. } => f.write_str("image"),
            Type::Sampler => f.write_str("sampler"),
            Type::SampledImage { image_ty } => write!(f, "sampled_image<{image_ty}>"),
            Type::Array { elem, length } => write!(f, "[{elem}; {length}]"),
            Type::RuntimeArray { elem } => write!(f, "[{elem}]"),
            Type::Struct { members } => {
                f.write_str("{ ")?;
                for (i, m) in members.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{m}")?;
                }
                f.write_str(" }")
            }
            Type::Pointer {
                storage_class,
                pointee,
            } => write!(f, "ptr<{storage_class:?}, {pointee}>"),
            Type::ForwardPointer {
                storage_class,
                pointee,
            } => write!(f, "fwdptr<{storage_class:?}, {pointee}>"),
            Type::Function { ret, params } => {
                f.write_str("fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Event => f.write_str("event"),
            Type::DeviceEvent => f.write_str("device_event"),
            Type::ReserveId => f.write_str("reserve_id"),
            Type::Queue => f.write_str("queue"),
            Type::PipeStorage => f.write_str("pipe_storage"),
            Type::NamedBarrier => f.write_str("named_barrier"),
            Type::AccelStruct => f.write_str("accel_struct"),
            Type::RayQuery => f.write_str("ray_query"),
        }
    }
}
