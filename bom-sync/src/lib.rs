pub mod blob;
pub mod cli;
pub mod load_config;
pub mod smartsheet;
pub mod trigger;

pub use cli::{run, Cli, Commands};
