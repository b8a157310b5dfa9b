use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "twinfile",
    about = "Crash-tolerant two-file storage for a single text value",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with `base_path`, `extension` and `sync_mode`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Logical path without numeric suffix (ignored with --config)
    #[arg(short, long, global = true, default_value = "data")]
    pub base: PathBuf,

    /// Extension of both files (ignored with --config)
    #[arg(short, long, global = true, default_value = "txt")]
    pub ext: String,

    /// Skip fsync after writing
    #[arg(long, global = true)]
    pub no_sync: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replace the older copy with new content
    Write(WriteArgs),
    /// Print the newest copy
    Read,
    /// Show both files and which one a read or write would use
    Status,
    /// Remove both files
    Delete,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Content to store; read from --file or stdin when omitted
    pub content: Option<String>,
    #[arg(short, long, conflicts_with = "content")]
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_read_with_defaults() {
        let cli = Cli::try_parse_from(["twinfile", "read"]).unwrap();
        assert!(matches!(cli.command, Command::Read));
        assert_eq!(cli.base, PathBuf::from("data"));
        assert_eq!(cli.ext, "txt");
        assert!(!cli.no_sync);
    }

    #[test]
    fn parse_write_inline() {
        let cli = Cli::try_parse_from(["twinfile", "write", "hello"]).unwrap();
        if let Command::Write(args) = cli.command {
            assert_eq!(args.content, Some("hello".into()));
            assert!(args.file.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_write_from_file() {
        let cli = Cli::try_parse_from(["twinfile", "write", "--file", "in.txt"]).unwrap();
        if let Command::Write(args) = cli.command {
            assert_eq!(args.file, Some(PathBuf::from("in.txt")));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn write_content_and_file_conflict() {
        assert!(Cli::try_parse_from(["twinfile", "write", "x", "--file", "in.txt"]).is_err());
    }

    #[test]
    fn parse_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "twinfile", "status", "--base", "state/app", "--ext", "json", "--format", "json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Status));
        assert_eq!(cli.base, PathBuf::from("state/app"));
        assert_eq!(cli.ext, "json");
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
