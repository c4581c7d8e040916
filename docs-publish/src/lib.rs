pub mod cli;
pub mod github;
pub mod libris;
pub mod load_config;

pub use cli::{run, Cli, Commands};
