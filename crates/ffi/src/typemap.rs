//! Per-backend lookup tables from raw source type tokens to ABI tags and stub
//! presentation types. Lookups never fail.

use std::ffi::{c_long, c_ulong};
use std::mem::size_of;

use common::Backend;

use crate::types::{AbiTypeTag, PresentationType, TypeMapping};

const C_LONG: AbiTypeTag = if size_of::<c_long>() == 8 {
    AbiTypeTag::I64
} else {
    AbiTypeTag::I32
};

const C_ULONG: AbiTypeTag = if size_of::<c_ulong>() == 8 {
    AbiTypeTag::U64
} else {
    AbiTypeTag::U32
};

const USIZE: AbiTypeTag = if size_of::<usize>() == 8 {
    AbiTypeTag::U64
} else {
    AbiTypeTag::U32
};

const ISIZE: AbiTypeTag = if size_of::<isize>() == 8 {
    AbiTypeTag::I64
} else {
    AbiTypeTag::I32
};

/// Words the C lookup ignores.
const C_QUALIFIERS: &[&str] = &[
    "const", "volatile", "static", "extern", "inline", "register", "restrict", "__restrict",
];

pub fn map_type(backend: Backend, raw: &str) -> TypeMapping {
    let tag = match backend {
        Backend::Clang => c_type_tag(raw),
        Backend::Konan => kotlin_type_tag(raw),
        Backend::Rust => rust_type_tag(raw),
    };
    match tag {
        Some(tag) => TypeMapping::Known(tag),
        None => {
            tracing::debug!(%backend, raw, "unmapped type, binding as void");
            TypeMapping::Unknown(raw.trim().to_string())
        }
    }
}

pub fn presentation_for_arg(backend: Backend, raw: &str) -> PresentationType {
    if is_textual(backend, raw) {
        PresentationType::Buffer
    } else if is_numeric(backend, raw) {
        PresentationType::Number
    } else {
        PresentationType::Unknown
    }
}

pub fn presentation_for_return(backend: Backend, raw: &str) -> PresentationType {
    if is_textual(backend, raw) {
        PresentationType::Text
    } else if is_numeric(backend, raw) {
        PresentationType::Number
    } else {
        PresentationType::Unknown
    }
}

/// C spelling of a Kotlin type for the `extern "C"` shim. Unmapped types
/// become `void`.
pub fn kotlin_to_c_type(raw: &str) -> &'static str {
    match kotlin_base_name(raw) {
        "String" => "const char*",
        "Number" | "Int" => "int",
        "Byte" | "Char" => "char",
        "Short" => "short",
        "Long" => "long long",
        "UByte" => "unsigned char",
        "UShort" => "unsigned short",
        "UInt" => "unsigned int",
        "ULong" => "unsigned long long",
        "Boolean" => "bool",
        "Float" => "float",
        "Double" => "double",
        "CFunction" => "void*",
        _ => "void",
    }
}

/// `const char *` -> `char*`, `unsigned   int` -> `unsigned int`.
fn normalize_c(raw: &str) -> String {
    let spaced = raw.replace('*', " * ");
    let mut out = String::new();
    for word in spaced.split_whitespace() {
        if C_QUALIFIERS.contains(&word) {
            continue;
        }
        if word == "*" {
            out.push('*');
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn c_type_tag(raw: &str) -> Option<AbiTypeTag> {
    let normalized = normalize_c(raw);
    let tag = match normalized.as_str() {
        "char" | "signed char" => AbiTypeTag::I8,
        "unsigned char" => AbiTypeTag::U8,
        "short" | "short int" | "signed short" | "signed short int" => AbiTypeTag::I16,
        "unsigned short" | "unsigned short int" => AbiTypeTag::U16,
        "int" | "signed" | "signed int" => AbiTypeTag::I32,
        "unsigned" | "unsigned int" => AbiTypeTag::U32,
        "long" | "long int" | "signed long" | "signed long int" => C_LONG,
        "unsigned long" | "unsigned long int" => C_ULONG,
        "long long" | "long long int" | "signed long long" | "signed long long int" => {
            AbiTypeTag::I64
        }
        "unsigned long long" | "unsigned long long int" => AbiTypeTag::U64,
        "float" => AbiTypeTag::F32,
        "double" | "long double" => AbiTypeTag::F64,
        "bool" | "_Bool" => AbiTypeTag::Bool,
        "int8_t" => AbiTypeTag::I8,
        "uint8_t" => AbiTypeTag::U8,
        "int16_t" => AbiTypeTag::I16,
        "uint16_t" => AbiTypeTag::U16,
        "int32_t" => AbiTypeTag::I32,
        "uint32_t" => AbiTypeTag::U32,
        "int64_t" => AbiTypeTag::I64,
        "uint64_t" => AbiTypeTag::U64,
        "size_t" | "uintptr_t" => USIZE,
        "ssize_t" | "ptrdiff_t" | "intptr_t" => ISIZE,
        "char*" => AbiTypeTag::CString,
        "void" => AbiTypeTag::Void,
        other if other.ends_with('*') && other.len() > 1 => AbiTypeTag::Ptr,
        _ => return None,
    };
    Some(tag)
}

/// Strips nullability and a `kotlin.` package prefix.
fn kotlin_base_name(raw: &str) -> &str {
    let trimmed = raw.trim().trim_end_matches('?');
    trimmed.strip_prefix("kotlin.").unwrap_or(trimmed)
}

fn kotlin_type_tag(raw: &str) -> Option<AbiTypeTag> {
    let tag = match kotlin_base_name(raw) {
        "String" => AbiTypeTag::CString,
        "Number" | "Int" => AbiTypeTag::I32,
        "Byte" | "Char" => AbiTypeTag::I8,
        "Short" => AbiTypeTag::I16,
        "Long" => AbiTypeTag::I64,
        "UByte" => AbiTypeTag::U8,
        "UShort" => AbiTypeTag::U16,
        "UInt" => AbiTypeTag::U32,
        "ULong" => AbiTypeTag::U64,
        "Boolean" => AbiTypeTag::Bool,
        "Float" => AbiTypeTag::F32,
        "Double" => AbiTypeTag::F64,
        "CFunction" => AbiTypeTag::Function,
        "Unit" => AbiTypeTag::Void,
        _ => return None,
    };
    Some(tag)
}

/// Last `::` segment, so `std::ffi::c_int` and `c_int` agree.
fn rust_last_segment(raw: &str) -> &str {
    raw.rsplit("::").next().unwrap_or(raw).trim()
}

fn is_rust_fn_type(ty: &str) -> bool {
    let ty = ty.strip_prefix("unsafe ").unwrap_or(ty);
    let ty = ty.strip_prefix("extern \"C\" ").unwrap_or(ty);
    ty.starts_with("fn(")
}

fn rust_type_tag(raw: &str) -> Option<AbiTypeTag> {
    let ty = raw.trim();
    if ty.is_empty() || ty == "()" {
        return Some(AbiTypeTag::Void);
    }
    if is_rust_fn_type(ty) {
        return Some(AbiTypeTag::Function);
    }
    if let Some(inner) = ty.strip_prefix("Option<").and_then(|s| s.strip_suffix('>')) {
        // Only nullable pointer-like payloads keep their ABI inside an Option.
        return rust_type_tag(inner).filter(|tag| tag.is_pointer());
    }
    if let Some(pointee) = ty
        .strip_prefix("*const ")
        .or_else(|| ty.strip_prefix("*mut "))
    {
        return Some(match rust_last_segment(pointee) {
            "c_char" => AbiTypeTag::CString,
            _ => AbiTypeTag::Ptr,
        });
    }
    if let Some(referent) = ty.strip_prefix('&') {
        // `&'a mut CStr` -> `CStr`
        let referent = referent.rsplit(' ').next().unwrap_or(referent);
        return Some(match rust_last_segment(referent) {
            "CStr" => AbiTypeTag::CString,
            _ => AbiTypeTag::Ptr,
        });
    }

    let tag = match rust_last_segment(ty) {
        "i8" | "c_char" | "c_schar" => AbiTypeTag::I8,
        "u8" | "c_uchar" => AbiTypeTag::U8,
        "i16" | "c_short" => AbiTypeTag::I16,
        "u16" | "c_ushort" => AbiTypeTag::U16,
        "i32" | "c_int" => AbiTypeTag::I32,
        "u32" | "c_uint" => AbiTypeTag::U32,
        "i64" | "c_longlong" => AbiTypeTag::I64,
        "u64" | "c_ulonglong" => AbiTypeTag::U64,
        "c_long" => C_LONG,
        "c_ulong" => C_ULONG,
        "usize" => USIZE,
        "isize" => ISIZE,
        "f32" | "c_float" | "float" => AbiTypeTag::F32,
        "f64" | "c_double" | "double" => AbiTypeTag::F64,
        "bool" => AbiTypeTag::Bool,
        "CStr" => AbiTypeTag::CString,
        _ => return None,
    };
    Some(tag)
}

const C_NUMERIC_WORDS: &[&str] = &["int", "long", "short", "double", "float", "size_t"];
const KOTLIN_NUMERIC_WORDS: &[&str] = &["Int", "Long", "Short", "Byte", "Float", "Double"];
const RUST_NUMERIC_WORDS: &[&str] = &[
    "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f32", "f64", "usize", "isize",
    "float", "double", "c_int", "c_uint", "c_long", "c_ulong", "c_short", "c_ushort",
    "c_float", "c_double",
];

fn is_textual(backend: Backend, raw: &str) -> bool {
    match backend {
        Backend::Clang => raw.contains("char"),
        Backend::Konan => raw.contains("String"),
        Backend::Rust => raw.contains("CStr") || raw.contains("c_char"),
    }
}

fn is_numeric(backend: Backend, raw: &str) -> bool {
    let words = match backend {
        Backend::Clang => C_NUMERIC_WORDS,
        Backend::Konan => KOTLIN_NUMERIC_WORDS,
        Backend::Rust => RUST_NUMERIC_WORDS,
    };
    words.iter().any(|word| raw.contains(word))
}
