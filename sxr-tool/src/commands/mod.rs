//! Command implementations

pub mod bonemap;
pub mod skeleton;
