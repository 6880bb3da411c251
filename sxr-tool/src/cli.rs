//! Root CLI structure for sxr-tool

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sxr-tool")]
#[command(about = "Command-line tools for SXR skeletons and bone maps", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Skeleton description operations
    Skeleton {
        #[command(subcommand)]
        command: crate::commands::skeleton::SkeletonCommands,
    },

    /// Retargeting bone map operations
    Bonemap {
        #[command(subcommand)]
        command: crate::commands::bonemap::BonemapCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
