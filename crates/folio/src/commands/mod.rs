//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod mv;

pub(crate) use build::BuildArgs;
pub(crate) use mv::MvArgs;
