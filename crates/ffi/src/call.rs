//! Call dispatch through `libffi`.

use std::ffi::{CStr, CString, c_char, c_void};

use libffi::middle::{Arg, Cif, CodePtr, Type};

use crate::error::{CallError, CallResult};
use crate::types::{AbiTypeTag, CallDescriptor};
use crate::value::NativeValue;

fn ffi_type(tag: AbiTypeTag) -> Type {
    match tag {
        AbiTypeTag::I8 => Type::i8(),
        AbiTypeTag::U8 | AbiTypeTag::Bool => Type::u8(),
        AbiTypeTag::I16 => Type::i16(),
        AbiTypeTag::U16 => Type::u16(),
        AbiTypeTag::I32 => Type::i32(),
        AbiTypeTag::U32 => Type::u32(),
        AbiTypeTag::I64 => Type::i64(),
        AbiTypeTag::U64 => Type::u64(),
        AbiTypeTag::F32 => Type::f32(),
        AbiTypeTag::F64 => Type::f64(),
        AbiTypeTag::CString | AbiTypeTag::Ptr | AbiTypeTag::Function => Type::pointer(),
        AbiTypeTag::Void => Type::void(),
    }
}

/// Owned storage for one argument; `Arg` borrows from it during the call.
enum Slot {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Ptr(*const c_void),
}

impl Slot {
    fn as_arg(&self) -> Arg {
        match self {
            Slot::I8(v) => Arg::new(v),
            Slot::U8(v) => Arg::new(v),
            Slot::I16(v) => Arg::new(v),
            Slot::U16(v) => Arg::new(v),
            Slot::I32(v) => Arg::new(v),
            Slot::U32(v) => Arg::new(v),
            Slot::I64(v) => Arg::new(v),
            Slot::U64(v) => Arg::new(v),
            Slot::F32(v) => Arg::new(v),
            Slot::F64(v) => Arg::new(v),
            Slot::Ptr(v) => Arg::new(v),
        }
    }
}

struct Marshaller<'a> {
    function: &'a str,
    strings: Vec<CString>,
}

impl Marshaller<'_> {
    fn mismatch(&self, index: usize, expected: AbiTypeTag, value: &NativeValue) -> CallError {
        CallError::Mismatch {
            function: self.function.to_string(),
            index,
            expected,
            found: value.kind().to_string(),
        }
    }

    fn signed(&self, index: usize, tag: AbiTypeTag, value: &NativeValue) -> CallResult<i64> {
        match value {
            NativeValue::Int(i) => Ok(*i),
            NativeValue::UInt(u) => i64::try_from(*u).map_err(|_| self.mismatch(index, tag, value)),
            NativeValue::Bool(b) => Ok(i64::from(*b)),
            _ => Err(self.mismatch(index, tag, value)),
        }
    }

    fn unsigned(&self, index: usize, tag: AbiTypeTag, value: &NativeValue) -> CallResult<u64> {
        match value {
            NativeValue::UInt(u) => Ok(*u),
            NativeValue::Int(i) => u64::try_from(*i).map_err(|_| self.mismatch(index, tag, value)),
            NativeValue::Bool(b) => Ok(u64::from(*b)),
            _ => Err(self.mismatch(index, tag, value)),
        }
    }

    fn float(&self, index: usize, tag: AbiTypeTag, value: &NativeValue) -> CallResult<f64> {
        match value {
            NativeValue::Float(x) => Ok(*x),
            NativeValue::Int(i) => Ok(*i as f64),
            NativeValue::UInt(u) => Ok(*u as f64),
            _ => Err(self.mismatch(index, tag, value)),
        }
    }

    fn pointer(&mut self, index: usize, tag: AbiTypeTag, value: &NativeValue) -> CallResult<*const c_void> {
        match value {
            NativeValue::Null => Ok(std::ptr::null()),
            NativeValue::Pointer(addr) => Ok(*addr as *const c_void),
            NativeValue::Text(text) if tag == AbiTypeTag::CString => {
                let owned = CString::new(text.as_str()).map_err(|_| CallError::InvalidString {
                    function: self.function.to_string(),
                    index,
                })?;
                let ptr = owned.as_ptr().cast::<c_void>();
                self.strings.push(owned);
                Ok(ptr)
            }
            _ => Err(self.mismatch(index, tag, value)),
        }
    }

    fn slot(&mut self, index: usize, tag: AbiTypeTag, value: &NativeValue) -> CallResult<Slot> {
        let slot = match tag {
            AbiTypeTag::I8 => Slot::I8(
                i8::try_from(self.signed(index, tag, value)?)
                    .map_err(|_| self.mismatch(index, tag, value))?,
            ),
            AbiTypeTag::I16 => Slot::I16(
                i16::try_from(self.signed(index, tag, value)?)
                    .map_err(|_| self.mismatch(index, tag, value))?,
            ),
            AbiTypeTag::I32 => Slot::I32(
                i32::try_from(self.signed(index, tag, value)?)
                    .map_err(|_| self.mismatch(index, tag, value))?,
            ),
            AbiTypeTag::I64 => Slot::I64(self.signed(index, tag, value)?),
            AbiTypeTag::U8 => Slot::U8(
                u8::try_from(self.unsigned(index, tag, value)?)
                    .map_err(|_| self.mismatch(index, tag, value))?,
            ),
            AbiTypeTag::U16 => Slot::U16(
                u16::try_from(self.unsigned(index, tag, value)?)
                    .map_err(|_| self.mismatch(index, tag, value))?,
            ),
            AbiTypeTag::U32 => Slot::U32(
                u32::try_from(self.unsigned(index, tag, value)?)
                    .map_err(|_| self.mismatch(index, tag, value))?,
            ),
            AbiTypeTag::U64 => Slot::U64(self.unsigned(index, tag, value)?),
            AbiTypeTag::F32 => Slot::F32(self.float(index, tag, value)? as f32),
            AbiTypeTag::F64 => Slot::F64(self.float(index, tag, value)?),
            AbiTypeTag::Bool => match value {
                NativeValue::Bool(b) => Slot::U8(u8::from(*b)),
                NativeValue::Int(0) | NativeValue::UInt(0) => Slot::U8(0),
                NativeValue::Int(1) | NativeValue::UInt(1) => Slot::U8(1),
                _ => return Err(self.mismatch(index, tag, value)),
            },
            AbiTypeTag::CString | AbiTypeTag::Ptr | AbiTypeTag::Function => {
                Slot::Ptr(self.pointer(index, tag, value)?)
            }
            // Unknown slots bind as void and cannot carry a value.
            AbiTypeTag::Void => return Err(self.mismatch(index, tag, value)),
        };
        Ok(slot)
    }
}

/// Calls `address` with `args` according to `descriptor`.
///
/// # Safety
/// `address` must point to a function whose real signature matches
/// `descriptor`, and pointer arguments must be valid for the callee.
pub(crate) unsafe fn invoke(
    function: &str,
    address: usize,
    descriptor: &CallDescriptor,
    args: &[NativeValue],
) -> CallResult<NativeValue> {
    if args.len() != descriptor.arity() {
        return Err(CallError::Arity {
            function: function.to_string(),
            expected: descriptor.arity(),
            found: args.len(),
        });
    }

    let mut marshaller = Marshaller {
        function,
        strings: Vec::new(),
    };
    let slots = descriptor
        .arg_tags()
        .zip(args)
        .enumerate()
        .map(|(index, (tag, value))| marshaller.slot(index, tag, value))
        .collect::<CallResult<Vec<_>>>()?;
    let ffi_args: Vec<Arg> = slots.iter().map(Slot::as_arg).collect();

    let arg_types: Vec<Type> = descriptor.arg_tags().map(ffi_type).collect();
    let cif = Cif::new(arg_types, ffi_type(descriptor.ret.tag()));
    let code = CodePtr(address as *mut c_void);

    // SAFETY: upheld by the caller; `slots` and `marshaller.strings` outlive the call.
    let value = unsafe {
        match descriptor.ret.tag() {
            AbiTypeTag::Void => {
                cif.call::<()>(code, &ffi_args);
                NativeValue::Void
            }
            // Integral returns narrower than a register come back widened to
            // `ffi_arg`, which is pointer sized on supported targets.
            AbiTypeTag::Bool => NativeValue::Bool(cif.call::<usize>(code, &ffi_args) as u8 != 0),
            AbiTypeTag::I8 => NativeValue::Int(i64::from(cif.call::<isize>(code, &ffi_args) as i8)),
            AbiTypeTag::I16 => NativeValue::Int(i64::from(cif.call::<isize>(code, &ffi_args) as i16)),
            AbiTypeTag::I32 => NativeValue::Int(i64::from(cif.call::<isize>(code, &ffi_args) as i32)),
            AbiTypeTag::I64 => NativeValue::Int(cif.call::<i64>(code, &ffi_args)),
            AbiTypeTag::U8 => NativeValue::UInt(u64::from(cif.call::<usize>(code, &ffi_args) as u8)),
            AbiTypeTag::U16 => NativeValue::UInt(u64::from(cif.call::<usize>(code, &ffi_args) as u16)),
            AbiTypeTag::U32 => NativeValue::UInt(u64::from(cif.call::<usize>(code, &ffi_args) as u32)),
            AbiTypeTag::U64 => NativeValue::UInt(cif.call::<u64>(code, &ffi_args)),
            AbiTypeTag::F32 => NativeValue::Float(f64::from(cif.call::<f32>(code, &ffi_args))),
            AbiTypeTag::F64 => NativeValue::Float(cif.call::<f64>(code, &ffi_args)),
            AbiTypeTag::CString => {
                let ptr = cif.call::<*const c_char>(code, &ffi_args);
                if ptr.is_null() {
                    NativeValue::Null
                } else {
                    NativeValue::Text(CStr::from_ptr(ptr).to_string_lossy().into_owned())
                }
            }
            AbiTypeTag::Ptr | AbiTypeTag::Function => {
                let ptr = cif.call::<*const c_void>(code, &ffi_args);
                if ptr.is_null() {
                    NativeValue::Null
                } else {
                    NativeValue::Pointer(ptr as usize)
                }
            }
        }
    };
    drop(marshaller);
    Ok(value)
}
