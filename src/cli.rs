use clap::{Args, Parser, Subcommand};
use glbrecode_basis::Preset;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glbrecode")]
#[command(author, version, about = "Recode embedded GLB textures to Basis Universal")]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub recode: RecodeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args)]
pub struct RecodeArgs {
    /// GLB file to recode
    #[arg(required = true)]
    pub input: Option<PathBuf>,

    /// Where to write the recoded GLB
    #[arg(required = true)]
    pub output: Option<PathBuf>,

    /// Encoder preset: standard, preview or full
    #[arg(short, long)]
    pub preset: Option<Preset>,

    /// Keep intermediate images and encoder output in this directory
    #[arg(long, value_name = "DIR")]
    pub keep_intermediates: Option<PathBuf>,

    /// Scale non power-of-two textures down before encoding
    #[arg(long)]
    pub resize_npot: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the buffer layout of a GLB file
    Inspect {
        /// GLB file to inspect
        #[arg(required = true)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the basisu encoder is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}
