// CLI binary entry point for chaptag

mod cli;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::commands::{command_detect, command_read};
use cli::{Commands, Config, OutputFormatter};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let config = Config::parse();
    init_logging(config.verbose);

    let formatter = OutputFormatter::new(config.format.clone(), config.quiet);
    let result = match &config.command {
        Commands::Read { files, output } => command_read(files, output.as_deref(), &formatter),
        Commands::Detect { files } => command_detect(files, &formatter),
    };

    match result {
        Ok(0) => {}
        Ok(failures) => {
            formatter.print_info(&format!("{} file(s) failed", failures));
            process::exit(1);
        }
        Err(e) => {
            formatter.print_error(&format!("{:#}", e));
            process::exit(1);
        }
    }
}
