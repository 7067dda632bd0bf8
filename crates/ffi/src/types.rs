use std::fmt;

use serde::{Deserialize, Serialize};

/// Value category at the native call boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiTypeTag {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    CString,
    Ptr,
    Function,
    Void,
}

impl AbiTypeTag {
    pub const ALL: [AbiTypeTag; 15] = [
        AbiTypeTag::I8,
        AbiTypeTag::U8,
        AbiTypeTag::I16,
        AbiTypeTag::U16,
        AbiTypeTag::I32,
        AbiTypeTag::U32,
        AbiTypeTag::I64,
        AbiTypeTag::U64,
        AbiTypeTag::F32,
        AbiTypeTag::F64,
        AbiTypeTag::Bool,
        AbiTypeTag::CString,
        AbiTypeTag::Ptr,
        AbiTypeTag::Function,
        AbiTypeTag::Void,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AbiTypeTag::I8 => "i8",
            AbiTypeTag::U8 => "u8",
            AbiTypeTag::I16 => "i16",
            AbiTypeTag::U16 => "u16",
            AbiTypeTag::I32 => "i32",
            AbiTypeTag::U32 => "u32",
            AbiTypeTag::I64 => "i64",
            AbiTypeTag::U64 => "u64",
            AbiTypeTag::F32 => "f32",
            AbiTypeTag::F64 => "f64",
            AbiTypeTag::Bool => "bool",
            AbiTypeTag::CString => "cstring",
            AbiTypeTag::Ptr => "ptr",
            AbiTypeTag::Function => "function",
            AbiTypeTag::Void => "void",
        }
    }

    /// Pointer-sized tags.
    pub fn is_pointer(self) -> bool {
        matches!(
            self,
            AbiTypeTag::CString | AbiTypeTag::Ptr | AbiTypeTag::Function
        )
    }
}

impl fmt::Display for AbiTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of looking a raw type token up in a backend table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeMapping {
    Known(AbiTypeTag),
    /// The raw token had no table entry. Binds as [`AbiTypeTag::Void`].
    Unknown(String),
}

impl TypeMapping {
    pub fn tag(&self) -> AbiTypeTag {
        match self {
            TypeMapping::Known(tag) => *tag,
            TypeMapping::Unknown(_) => AbiTypeTag::Void,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeMapping::Unknown(_))
    }
}

impl fmt::Display for TypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeMapping::Known(tag) => write!(f, "{tag}"),
            TypeMapping::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

/// Coarse type used only in the declaration stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresentationType {
    /// Byte buffer argument.
    Buffer,
    /// String return value.
    Text,
    Number,
    Unknown,
}

impl PresentationType {
    pub fn as_str(self) -> &'static str {
        match self {
            PresentationType::Buffer => "Buffer",
            PresentationType::Text => "string",
            PresentationType::Number => "number",
            PresentationType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PresentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ABI shape of one exported function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDescriptor {
    pub args: Vec<TypeMapping>,
    pub ret: TypeMapping,
}

impl CallDescriptor {
    pub fn arg_tags(&self) -> impl Iterator<Item = AbiTypeTag> + '_ {
        self.args.iter().map(TypeMapping::tag)
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn has_unknown(&self) -> bool {
        self.ret.is_unknown() || self.args.iter().any(TypeMapping::is_unknown)
    }
}

impl fmt::Display for CallDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
