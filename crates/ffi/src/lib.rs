//! ABI type mapping, symbol binding and declaration stubs for built native
//! modules.
//!
//! The [`typemap`] tables are total: every raw type token maps to either a
//! known [`AbiTypeTag`] or an explicit [`TypeMapping::Unknown`]. The
//! [`binder`] opens a compiled artifact with `libloading` and calls into it
//! through `libffi`.

pub mod binder;
mod call;
pub mod error;
pub mod stubgen;
pub mod typemap;
pub mod types;
pub mod value;

pub use binder::{BindOptions, Binder, BoundFunction, BoundModule, bind, describe_signatures};
pub use error::{BindError, BindResult, CallError, CallResult};
pub use stubgen::{render_declarations, render_kotlin_shim, stub_file_name, stub_path};
pub use typemap::{kotlin_to_c_type, map_type, presentation_for_arg, presentation_for_return};
pub use types::{AbiTypeTag, CallDescriptor, PresentationType, TypeMapping};
pub use value::NativeValue;
