use clap::Parser;
use tracing_subscriber::EnvFilter;

use da_light_client::command::{head, init, start, verify_block, version, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Operational logging for both crates; RUST_LOG directives are layered on top.
    let mut filter = EnvFilter::new("da_light_client=info,da_rpc_client=info");
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if let Ok(parsed) = env_filter.parse() {
            filter = filter.add_directive(parsed);
        }
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Init {} => init()?,
        Commands::Start {} => start().await?,
        Commands::VerifyBlock { number } => verify_block(number).await?,
        Commands::Head {} => head().await?,
        Commands::Version {} => version(),
    }

    Ok(())
}
