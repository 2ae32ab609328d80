use async_trait::async_trait;
use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::WalletSettings;
use crate::model::wallet::{ProviderEvent, ProviderId, ProviderSession};
use crate::wallet::demo::DemoWalletProvider;
use crate::wallet::error::ConnectionError;
use crate::wallet::evm::EvmWalletProvider;
use crate::wallet::solana::SolanaWalletProvider;

/// One external wallet. Implementations talk to whatever SDK or bridge backs
/// the wallet; the coordinator only relies on this contract.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Prompts the user to approve access and returns the granted accounts
    /// and the wallet's current chain.
    async fn request_connection(&self) -> Result<ProviderSession, ConnectionError>;

    async fn request_disconnection(&self) -> Result<(), ConnectionError>;

    /// Native balance of `address` on `chain_id`, in whole units.
    async fn get_balance(&self, address: &str, chain_id: u64) -> Result<Decimal, ConnectionError>;

    /// Account, chain and disconnect notifications pushed by the wallet.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Lookup table of available wallets keyed by provider id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn WalletProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn WalletProvider>) {
        let id = provider.id();
        if self.providers.insert(id, provider).is_some() {
            warn!("⚠️ Replaced existing wallet provider registration for {}", id);
        }
    }

    pub fn with(mut self, provider: Arc<dyn WalletProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn WalletProvider>> {
        self.providers.get(&id).cloned()
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }

    /// Registered ids in a stable order.
    pub fn ids(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .iter()
            .copied()
            .filter(|id| self.providers.contains_key(id))
            .collect()
    }

    pub fn from_settings(settings: &WalletSettings) -> Self {
        let mut registry = Self::new();

        for (name, endpoint) in &settings.providers {
            let id = match name.parse::<ProviderId>() {
                Ok(id) => id,
                Err(e) => {
                    warn!("⚠️ Skipping wallet provider config: {}", e);
                    continue;
                }
            };

            let provider: Arc<dyn WalletProvider> = match id {
                ProviderId::MetaMask | ProviderId::Coinbase | ProviderId::WalletConnect => {
                    match EvmWalletProvider::new(id, endpoint) {
                        Ok(p) => Arc::new(p),
                        Err(e) => {
                            warn!("⚠️ Skipping {}: {}", id, e);
                            continue;
                        }
                    }
                }
                ProviderId::Phantom => match SolanaWalletProvider::new(endpoint) {
                    Ok(p) => Arc::new(p),
                    Err(e) => {
                        warn!("⚠️ Skipping {}: {}", id, e);
                        continue;
                    }
                },
                ProviderId::Demo => Arc::new(DemoWalletProvider::new()),
            };

            info!("👛 Registered wallet provider {}", id);
            registry.register(provider);
        }

        registry
    }
}
