//! Runtime components for starting and stopping node processes

pub mod command;
pub mod process;
pub mod supervisor;

pub use command::*;
pub use process::*;
pub use supervisor::*;
