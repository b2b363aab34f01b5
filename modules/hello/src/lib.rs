//! The classic hello-world modules, written against the `kmod` API.
#![no_std]

extern crate alloc;

mod hello1;
mod hello2;
mod hello5;

pub use hello1::Hello1;
pub use hello2::Hello2;
pub use hello5::Hello5;
