//! Component-side half of module parameters.
//!
//! A component declares its parameters in a [`ParamTable`], receives its
//! own [`ParamValues`] filled in by the loader, and implements [`Module`]
//! to run once those values are final.
#![no_std]

extern crate alloc;

mod error;
pub mod kstrtox;
mod module;
mod param;
mod perm;
mod table;
mod values;

use axerrno::{LinuxError, LinuxResult};

pub use error::{ParamError, ParamResult};
pub use module::{Module, ModuleInfo};
pub use param::{
    ArrayValue, HexInt, InvBool, KernelParamValue, MAX_CHARP_LEN, ParamValue, ScalarKind,
};
pub use perm::ParamPerm;
pub use table::{ParamKind, ParamSpec, ParamTable, ParamTableBuilder, parameq};
pub use values::{ArrayView, ParamValues};

pub type Result<T> = LinuxResult<T>;
pub type ModuleErr = LinuxError;
