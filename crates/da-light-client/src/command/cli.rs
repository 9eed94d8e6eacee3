use clap::{Parser, Subcommand};

pub const VERSION: &str = "v0.1.0";

#[derive(Parser)]
#[command(name = "da-light-client", version = VERSION, about = "Data availability light client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize configuration and home directory
    Init {},

    /// Follow the chain and sample every new block
    Start {},

    /// Sample a single block and print its report
    #[command(
        about = "Sample a single block and print its report",
        after_help = "EXAMPLES:\n    da-light-client verify-block 42"
    )]
    VerifyBlock {
        /// Block number
        number: u64,
    },

    /// Show the node's latest finalized header
    Head {},

    /// Show the service version
    Version {},
}
