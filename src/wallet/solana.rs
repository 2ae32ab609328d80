use async_trait::async_trait;
use log::info;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::config::ProviderEndpoint;
use crate::model::wallet::{ProviderEvent, ProviderId, ProviderSession};
use crate::wallet::error::ConnectionError;
use crate::wallet::events::EventStream;
use crate::wallet::provider::WalletProvider;
use crate::wallet::rpc::JsonRpcClient;

/// Chain id wallet adapters report for Solana mainnet-beta.
pub const SOLANA_MAINNET: u64 = 101;
pub const SOLANA_TESTNET: u64 = 102;
pub const SOLANA_DEVNET: u64 = 103;

const LAMPORT_DECIMALS: u32 = 9;

/// Phantom, reached through its bridge for approval and a Solana RPC node
/// for balances.
pub struct SolanaWalletProvider {
    bridge: JsonRpcClient,
    node: JsonRpcClient,
    events: EventStream,
}

impl SolanaWalletProvider {
    pub fn new(endpoint: &ProviderEndpoint) -> Result<Self, ConnectionError> {
        let bridge = JsonRpcClient::new(&endpoint.bridge_url)?;
        let node = JsonRpcClient::new(
            endpoint
                .rpc_url
                .as_deref()
                .unwrap_or("https://api.mainnet-beta.solana.com"),
        )?;

        Ok(Self {
            bridge,
            node,
            events: EventStream::new(endpoint.events_url.clone()),
        })
    }
}

fn cluster_chain_id(cluster: &str) -> Option<u64> {
    match cluster {
        "mainnet-beta" | "mainnet" => Some(SOLANA_MAINNET),
        "testnet" => Some(SOLANA_TESTNET),
        "devnet" => Some(SOLANA_DEVNET),
        _ => None,
    }
}

fn parse_session(result: &Value) -> Result<ProviderSession, ConnectionError> {
    let public_key = result
        .get("publicKey")
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectionError::Unknown(format!("unexpected connect result: {}", result)))?;

    let cluster = result.get("cluster").and_then(Value::as_str).unwrap_or("mainnet-beta");
    let chain_id = cluster_chain_id(cluster).ok_or(ConnectionError::UnsupportedChain { chain_id: 0 })?;

    Ok(ProviderSession {
        accounts: vec![public_key.to_string()],
        chain_id,
    })
}

fn lamports_to_sol(result: &Value) -> Result<Decimal, ConnectionError> {
    let lamports = result
        .get("value")
        .and_then(Value::as_u64)
        .ok_or_else(|| ConnectionError::Unknown(format!("unexpected getBalance result: {}", result)))?;
    Ok(Decimal::from_i128_with_scale(lamports as i128, LAMPORT_DECIMALS).normalize())
}

#[async_trait]
impl WalletProvider for SolanaWalletProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Phantom
    }

    async fn request_connection(&self) -> Result<ProviderSession, ConnectionError> {
        info!("👛 Requesting Phantom connection at {}", self.bridge.url());
        let result = self.bridge.call("connect", json!({})).await?;
        let session = parse_session(&result)?;
        self.events.ensure_listening().await;
        Ok(session)
    }

    async fn request_disconnection(&self) -> Result<(), ConnectionError> {
        self.bridge.call("disconnect", json!({})).await.map(|_| ())
    }

    async fn get_balance(&self, address: &str, _chain_id: u64) -> Result<Decimal, ConnectionError> {
        let result = self.node.call("getBalance", json!([address])).await?;
        lamports_to_sol(&result)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
