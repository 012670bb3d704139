//! Terminal user interface

mod cli;

pub use cli::*;
