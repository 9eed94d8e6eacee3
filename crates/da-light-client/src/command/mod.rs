use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use da_rpc_client::{ChainClient, ClientConfig, RpcChainClient};
use tracing::info;

use crate::catchup::CatchUpLoop;
use crate::config::Config;
use crate::verify::{BlockVerifier, SamplingStrategy, StructuralVerifier, VerifierPool, COMMITMENT_SIZE};

pub mod cli;
pub use cli::{Cli, Commands};

pub fn init() -> Result<()> {
    Config::init()?;

    Ok(())
}

pub async fn start() -> Result<()> {
    let config = Config::load()?;
    let client = chain_client(&config)?;
    let catch_up = CatchUpLoop::new(client.clone(), block_verifier(&config, client), config.poll_settings());

    info!(
        "sampling {} cells per block from a {}x{} matrix",
        config.sampling.sample_count, config.matrix.cols, config.matrix.rows
    );
    catch_up.connect(config.startup.max_attempts).await?;
    catch_up.run().await
}

pub async fn verify_block(number: u64) -> Result<()> {
    let config = Config::load()?;
    let client = chain_client(&config)?;

    let block = client
        .block_by_number(number)
        .await
        .ok_or_else(|| anyhow!("block #{number} could not be fetched"))?;

    let report = block_verifier(&config, client).verify_block(&block).await;
    info!("{report}");
    info!("confidence: {:.2}", report.confidence());

    Ok(())
}

pub async fn head() -> Result<()> {
    let config = Config::load()?;
    let client = chain_client(&config)?;

    let header = client
        .latest_header()
        .await
        .ok_or_else(|| anyhow!("node at {} returned no header", config.rpc.url))?;
    let root = header.commitment_root();

    info!("Latest finalized header:");
    info!("  Number: {}", header.number);
    info!("  Commitment root: {} bytes", root.len());
    if let Some(first) = root.get(..COMMITMENT_SIZE) {
        info!("  Column 0 commitment: 0x{}", hex::encode(first));
    }

    Ok(())
}

pub fn version() {
    info!("version: {}", cli::VERSION);
}

fn chain_client(config: &Config) -> Result<Arc<dyn ChainClient>> {
    let client_config = ClientConfig::new(
        config.rpc.url.clone(),
        Duration::from_millis(config.rpc.request_timeout_ms),
    );
    Ok(Arc::new(RpcChainClient::new(client_config)?))
}

fn block_verifier(config: &Config, client: Arc<dyn ChainClient>) -> BlockVerifier {
    let pool = VerifierPool::new(
        Arc::new(StructuralVerifier),
        config.verifier.workers,
        config.verifier.sample_timeout(),
    );
    let sampler = SamplingStrategy::new(config.dimensions(), config.sampling.distinct);

    BlockVerifier::new(client, Arc::new(pool), sampler, config.sampling.sample_count)
}
