use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Disk utilization calculator (parallel edition).
#[derive(Clone, Debug, Parser)]
#[command(name = "pardu", version)]
#[command(about = "Disk utilization calculator (parallel edition).")]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Files or directories to measure.
    #[arg(value_name = "PATH", required = true, num_args = 1..)]
    pub paths: Vec<PathBuf>,

    /// Follow symlinks.
    #[arg(long = "follow-symlinks", short = 'L')]
    pub follow_symlinks: bool,

    /// Show all files & dirs.
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Stay on the filesystem of each PATH; skip mounted subtrees.
    #[arg(long = "one-file-system", short = 'x')]
    pub one_file_system: bool,

    /// Show size in human readable form.
    #[arg(long = "human-size", short = 'h', conflicts_with_all = ["kilo_byte", "byte"])]
    pub human_size: bool,

    /// Show size in kilo bytes.
    #[arg(long = "kilo-byte", short = 'k', conflicts_with = "byte")]
    pub kilo_byte: bool,

    /// Show size in bytes (default).
    #[arg(long, short = 'b')]
    pub byte: bool,

    /// Show total size.
    #[arg(long, short = 't')]
    pub total: bool,

    /// Worker threads. Default: twice the available parallelism, capped by the open file limit.
    #[arg(long, short = 'j', value_parser = clap::value_parser!(usize))]
    pub jobs: Option<usize>,

    /// Show verbose output.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Print help.
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}
