//! the command line interface of `bobfs`
mod cli_struct;
mod commands;

pub use cli_struct::*;
pub use commands::run;
