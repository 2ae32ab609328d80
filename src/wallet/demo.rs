use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use crate::model::wallet::{ProviderEvent, ProviderId, ProviderSession};
use crate::wallet::error::ConnectionError;
use crate::wallet::provider::WalletProvider;

pub const DEMO_ADDRESS: &str = "0xdfc24b077bc1425ad1dea75bcb6f8158e10df303";

/// In-process wallet used by demo mode. Always approves and reports a fixed
/// account on Ethereum mainnet.
pub struct DemoWalletProvider {
    events: broadcast::Sender<ProviderEvent>,
    balance: Decimal,
}

impl DemoWalletProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            balance: dec!(3.2145),
        }
    }
}

impl Default for DemoWalletProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletProvider for DemoWalletProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Demo
    }

    async fn request_connection(&self) -> Result<ProviderSession, ConnectionError> {
        Ok(ProviderSession {
            accounts: vec![DEMO_ADDRESS.to_string()],
            chain_id: 1,
        })
    }

    async fn request_disconnection(&self) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn get_balance(&self, _address: &str, chain_id: u64) -> Result<Decimal, ConnectionError> {
        // Each demo chain gets a different but stable balance.
        Ok(self.balance * Decimal::from(chain_id % 7 + 1))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
