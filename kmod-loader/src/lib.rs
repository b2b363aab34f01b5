//! Loader-side half of module parameters.
//!
//! [`ModuleLoader`] parses load-time arguments against a module's
//! declaration table, stores them in the instance's own cells, and only
//! then calls the module's init function.
#![no_std]

extern crate alloc;

mod loader;
mod param;

pub use loader::{LoadError, LoaderConfig, ModuleLoader, ModuleOwner};
pub use param::{ParsedArgs, UnknownParamPolicy, parse_args, parse_tokens};
