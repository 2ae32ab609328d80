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
use crate::wallet::rpc::{parse_hex_quantity, JsonRpcClient};

const WEI_DECIMALS: u32 = 18;

/// An EIP-1193 wallet (MetaMask, Coinbase Wallet, WalletConnect) reached
/// through its JSON-RPC bridge.
pub struct EvmWalletProvider {
    id: ProviderId,
    bridge: JsonRpcClient,
    node: Option<JsonRpcClient>,
    events: EventStream,
}

impl EvmWalletProvider {
    pub fn new(id: ProviderId, endpoint: &ProviderEndpoint) -> Result<Self, ConnectionError> {
        let bridge = JsonRpcClient::new(&endpoint.bridge_url)?;
        let node = endpoint.rpc_url.as_deref().map(JsonRpcClient::new).transpose()?;

        Ok(Self {
            id,
            bridge,
            node,
            events: EventStream::new(endpoint.events_url.clone()),
        })
    }

    fn balance_client(&self) -> &JsonRpcClient {
        self.node.as_ref().unwrap_or(&self.bridge)
    }
}

#[async_trait]
impl WalletProvider for EvmWalletProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn request_connection(&self) -> Result<ProviderSession, ConnectionError> {
        info!("👛 Requesting accounts from {} at {}", self.id, self.bridge.url());

        let accounts = self.bridge.call("eth_requestAccounts", json!([])).await?;
        let accounts = accounts
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.as_str().map(str::to_lowercase))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let chain = self.bridge.call("eth_chainId", json!([])).await?;
        let chain_id = chain
            .as_str()
            .and_then(parse_hex_quantity)
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| ConnectionError::Unknown(format!("unexpected eth_chainId result: {}", chain)))?;

        self.events.ensure_listening().await;

        Ok(ProviderSession { accounts, chain_id })
    }

    async fn request_disconnection(&self) -> Result<(), ConnectionError> {
        self.bridge
            .call("wallet_revokePermissions", json!([{ "eth_accounts": {} }]))
            .await
            .map(|_| ())
    }

    async fn get_balance(&self, address: &str, _chain_id: u64) -> Result<Decimal, ConnectionError> {
        let result = self
            .balance_client()
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        wei_to_ether(&result)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn wei_to_ether(result: &Value) -> Result<Decimal, ConnectionError> {
    let wei = result
        .as_str()
        .and_then(parse_hex_quantity)
        .ok_or_else(|| ConnectionError::Unknown(format!("unexpected eth_getBalance result: {}", result)))?;

    i128::try_from(wei)
        .ok()
        .and_then(|wei| Decimal::try_from_i128_with_scale(wei, WEI_DECIMALS).ok())
        .map(|ether| ether.normalize())
        .ok_or_else(|| ConnectionError::Unknown(format!("balance out of range: {} wei", wei)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_wei_to_ether() {
        // 1.5 ETH
        assert_eq!(wei_to_ether(&json!("0x14d1120d7b160000")), Ok(dec!(1.5)));
        assert_eq!(wei_to_ether(&json!("0x0")), Ok(Decimal::ZERO));
        assert!(wei_to_ether(&json!(12)).is_err());
    }

    #[test]
    fn rejects_invalid_bridge_url() {
        let endpoint = ProviderEndpoint {
            bridge_url: "metamask".to_string(),
            rpc_url: None,
            events_url: None,
        };
        assert!(EvmWalletProvider::new(ProviderId::MetaMask, &endpoint).is_err());
    }
}
