// CLI configuration
use clap::{Parser, Subcommand, ValueEnum};

/// Chaptag - ID3v2 chapter listing tool
#[derive(Parser, Debug)]
#[command(name = "chaptag")]
#[command(about = "List ID3v2 chapters and tables of contents", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (debug logging unless RUST_LOG is set)
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for chapter listings
#[derive(Debug, Clone, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON, one document per file
    Json,
    /// Aligned text
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read chapters from audio file(s)
    Read {
        /// Audio file path(s) or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Detect ID3v2 tags and count chapters
    Detect {
        /// Audio file path(s) or glob patterns
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_with_format() {
        let config = Config::try_parse_from(["chaptag", "-f", "table", "read", "a.mp3", "b.mp3"]).unwrap();
        assert_eq!(config.format, OutputFormat::Table);
        match config.command {
            Commands::Read { files, output } => {
                assert_eq!(files, vec!["a.mp3", "b.mp3"]);
                assert!(output.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn requires_files() {
        assert!(Config::try_parse_from(["chaptag", "detect"]).is_err());
    }
}
