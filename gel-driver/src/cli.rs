use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gelc",
    about = "Build, verify and print Gelleau IR modules",
    version
)]
pub struct Cli {
    /// Enable logging (filter with RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Verifier configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Treat verifier warnings as errors
    #[arg(long, global = true)]
    pub deny_warnings: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the `gelleau` module with its `sum` function and print it
    Demo {
        /// Write the module here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a module file and print it
    Emit {
        /// Module in text or JSON (`.json`) form
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a module file and report findings
    Verify {
        /// Module in text or JSON (`.json`) form
        input: PathBuf,
    },

    /// Parse a text module and rewrite it in canonical form
    Fmt {
        input: PathBuf,

        /// Rewrite the input file in place
        #[arg(short, long)]
        in_place: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}
