// CLI module for chaptag
//
// Only compiled into the binary.

pub mod commands;
pub mod config;
pub mod output;

pub use config::{Commands, Config, OutputFormat};
pub use output::OutputFormatter;
