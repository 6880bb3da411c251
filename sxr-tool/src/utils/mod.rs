//! Shared utilities for the sxr-tool CLI

pub mod io;
pub mod tree;

pub use io::*;
pub use tree::*;
