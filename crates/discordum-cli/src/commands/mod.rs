//! Subcommand implementations.

pub(crate) mod args;
pub(crate) mod provision;
pub(crate) mod run;
