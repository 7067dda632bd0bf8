use std::fmt;

/// A value crossing the native call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Result of a `void` (or unknown) return.
    Void,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Passed as a NUL-terminated copy; returned C strings are copied out.
    Text(String),
    Pointer(usize),
    Null,
}

impl NativeValue {
    pub fn kind(&self) -> &'static str {
        match self {
            NativeValue::Void => "void",
            NativeValue::Bool(_) => "bool",
            NativeValue::Int(_) => "int",
            NativeValue::UInt(_) => "uint",
            NativeValue::Float(_) => "float",
            NativeValue::Text(_) => "text",
            NativeValue::Pointer(_) => "pointer",
            NativeValue::Null => "null",
        }
    }

    /// Parses a command-line literal: `true`/`false`, `null`, integers,
    /// floats, `0x` addresses, and anything else as text. A leading `"` forces
    /// text.
    pub fn parse_literal(literal: &str) -> Self {
        if let Some(quoted) = literal.strip_prefix('"') {
            return NativeValue::Text(quoted.strip_suffix('"').unwrap_or(quoted).to_string());
        }
        match literal {
            "true" => return NativeValue::Bool(true),
            "false" => return NativeValue::Bool(false),
            "null" => return NativeValue::Null,
            _ => {}
        }
        if let Some(hex) = literal.strip_prefix("0x") {
            if let Ok(addr) = usize::from_str_radix(hex, 16) {
                return NativeValue::Pointer(addr);
            }
        }
        if let Ok(int) = literal.parse::<i64>() {
            return NativeValue::Int(int);
        }
        if let Ok(uint) = literal.parse::<u64>() {
            return NativeValue::UInt(uint);
        }
        if let Ok(float) = literal.parse::<f64>() {
            return NativeValue::Float(float);
        }
        NativeValue::Text(literal.to_string())
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Void => f.write_str("()"),
            NativeValue::Bool(b) => write!(f, "{b}"),
            NativeValue::Int(i) => write!(f, "{i}"),
            NativeValue::UInt(u) => write!(f, "{u}"),
            NativeValue::Float(x) => write!(f, "{x}"),
            NativeValue::Text(s) => write!(f, "{s:?}"),
            NativeValue::Pointer(p) => write!(f, "{p:#x}"),
            NativeValue::Null => f.write_str("null"),
        }
    }
}
