//! Subcommand implementations.

pub mod embed;
pub mod inspect;
pub mod ls;
