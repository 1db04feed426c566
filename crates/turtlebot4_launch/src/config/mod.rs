//! Launch description parsing, substitution and package lookup

mod builtin;
mod launch_file;
mod package;
mod substitution;

pub use builtin::*;
pub use launch_file::*;
pub use package::*;
pub use substitution::*;
