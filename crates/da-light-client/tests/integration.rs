use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use da_light_client::catchup::{CatchUpLoop, PollSettings, Tick};
use da_light_client::verify::{
    BlockVerifier, MatrixDimensions, SamplingStrategy, StructuralVerifier, VerifierPool, COMMITMENT_SIZE,
};
use da_light_client::{BlockOutcome, SampleTally};
use da_rpc_client::{ChainClient, ClientConfig, RpcChainClient};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const COLS: u32 = 4;
const ROWS: u32 = 4;

struct Node {
    head: u64,
    /// Blocks whose commitment root is one column short.
    short_root: Option<u64>,
}

fn commitment_root(cols: u32) -> Vec<u8> {
    let mut root = vec![0x33; COMMITMENT_SIZE * cols as usize];
    for chunk in root.chunks_mut(COMMITMENT_SIZE) {
        chunk[0] = 0x80;
    }
    root
}

fn header(node: &Node, number: u64) -> Value {
    let cols = if node.short_root == Some(number) { COLS - 1 } else { COLS };
    json!({
        "number": format!("0x{number:x}"),
        "parentHash": format!("0x{:064x}", number.saturating_sub(1)),
        "extrinsicsRoot": { "commitment": commitment_root(cols) }
    })
}

async fn handle(State(node): State<Arc<Node>>, Json(request): Json<Value>) -> Json<Value> {
    let params = &request["params"];
    let result = match request["method"].as_str().unwrap_or_default() {
        "chain_getHeader" => header(&node, node.head),
        "chain_getBlockHash" => json!(format!("0x{:064x}", params[0].as_u64().unwrap_or_default())),
        "chain_getBlock" => {
            let hash = params[0].as_str().unwrap_or_default().trim_start_matches("0x");
            let number = u64::from_str_radix(hash, 16).unwrap_or_default();
            json!({ "block": { "header": header(&node, number), "extrinsics": [] } })
        }
        "kate_queryProof" => {
            let mut proof = vec![0xa0u8];
            proof.resize(80, 0x44);
            json!(format!("0x{}", hex::encode(&proof)))
        }
        _ => Value::Null,
    };

    Json(json!({ "id": request["id"], "jsonrpc": "2.0", "result": result }))
}

async fn spawn_node(node: Node) -> Arc<dyn ChainClient> {
    let app = Router::new().route("/", post(handle)).with_state(Arc::new(node));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig::new(format!("http://{addr}"), Duration::from_secs(5));
    Arc::new(RpcChainClient::new(config).unwrap())
}

fn catch_up_loop(client: Arc<dyn ChainClient>) -> CatchUpLoop {
    let pool = VerifierPool::new(Arc::new(StructuralVerifier), 3, Duration::from_secs(5));
    let sampler = SamplingStrategy::new(MatrixDimensions::new(ROWS, COLS), false);
    let verifier = BlockVerifier::new(client.clone(), Arc::new(pool), sampler, 3);
    CatchUpLoop::new(client, verifier, PollSettings::default())
}

#[tokio::test]
async fn test_catch_up_over_http() {
    let client = spawn_node(Node {
        head: 3,
        short_root: Some(2),
    })
    .await;
    let mut catch_up = catch_up_loop(client);

    catch_up.connect(1).await.unwrap();
    let Tick::CaughtUp(summary) = catch_up.tick().await else {
        panic!("expected the loop to catch up");
    };

    assert_eq!(catch_up.watermark(), 3);
    assert_eq!(summary.reports.len(), 3);
    assert!(summary.skipped.is_empty());

    let all_valid = BlockOutcome::Sampled(SampleTally {
        valid: 3,
        invalid: 0,
        failed: 0,
    });
    assert_eq!(summary.reports[0].outcome, all_valid);
    assert!(matches!(summary.reports[1].outcome, BlockOutcome::Malformed(_)));
    assert_eq!(summary.reports[2].outcome, all_valid);
}
