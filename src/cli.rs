use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// Machine-readable JSON
    Json,
}

/// Inspect and benchmark BMEcat 1.2 catalogs
#[derive(Parser, Debug, Clone)]
#[command(name = "bmecat")]
#[command(about = "Read BMEcat 1.2 product catalogs and report on their contents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format
    #[arg(long = "format", value_enum, global = true)]
    pub output_format: Option<OutputFormat>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print catalog summary counts from the header
    Info(FileArgs),
    /// Read the whole catalog and report throughput
    Perf(FileArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    /// Report reader progress on stderr
    #[arg(short = 'P', long = "progress")]
    pub progress: bool,

    /// Catalog file to read
    pub file: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn file_args(&self) -> &FileArgs {
        match &self.command {
            Command::Info(args) | Command::Perf(args) => args,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let file = &self.file_args().file;
        if !file.exists() {
            return Err(format!("File does not exist: {}", file.display()));
        }
        if !file.is_file() {
            return Err(format!("Not a file: {}", file.display()));
        }
        Ok(())
    }
}
