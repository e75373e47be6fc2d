//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use conpack_config::Compression;
use std::path::PathBuf;

/// conpack - consolidate per-platform tool packages into one archive
#[derive(Parser)]
#[command(name = "conpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Consolidate per-platform tool packages into one deduplicated archive")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH", env = "CONPACK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a consolidated archive from a package list
    Consolidate {
        /// TOML package list (`[[package]]` tables)
        #[arg(short, long, value_name = "FILE")]
        packages: PathBuf,

        /// Directory that receives `<hash>.zip`
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        /// Skip packages that fail to read instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Keep older consolidated archives in the output directory
        #[arg(long)]
        no_prune: bool,

        /// Folder inside container packages holding per-platform archives
        #[arg(long, value_name = "NAME")]
        tools_folder: Option<String>,

        /// Compression for stored blobs
        #[arg(long, value_enum)]
        compression: Option<CompressionArg>,
    },

    /// Show the index of a consolidated archive
    Inspect {
        /// Consolidated archive
        archive: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompressionArg {
    Deflated,
    Stored,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Deflated => Compression::Deflated,
            CompressionArg::Stored => Compression::Stored,
        }
    }
}
