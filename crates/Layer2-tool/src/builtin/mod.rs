//! Builtin tools for Stepwise

pub mod command;
pub mod weather;
pub mod write;
