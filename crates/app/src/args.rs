pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pass-share")]
#[command(about = "Verify and open shared vaults")]
pub struct Args {
    /// Path to the pass-share config directory (defaults to ~/.pass-share)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log level override (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
