pub mod demo;
pub mod error;
pub mod events;
pub mod evm;
pub mod provider;
pub mod rpc;
pub mod solana;

use chrono::Utc;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::config::WalletSettings;
use crate::model::wallet::{chain_name, ConnectionStatus, ProviderEvent, ProviderId, WalletConnection};

pub use error::{ConnectionError, DisconnectionError};
pub use provider::{ProviderRegistry, WalletProvider};

pub type ConnectResult = Result<WalletConnection, ConnectionError>;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

struct CoordinatorState {
    status: ConnectionStatus,
    connection: Option<WalletConnection>,
    last_error: Option<ConnectionError>,
    in_flight: Option<watch::Receiver<Option<ConnectResult>>>,
    cancel_requested: bool,
    /// Bumped whenever the active session ends or is replaced, so events and
    /// balance replies from an older session are dropped.
    generation: u64,
    watcher: Option<JoinHandle<()>>,
}

struct Shared {
    registry: ProviderRegistry,
    supported_chains: Vec<u64>,
    connect_timeout: Duration,
    state: RwLock<CoordinatorState>,
    status_tx: broadcast::Sender<ConnectionStatus>,
}

/// Owns the single active wallet session.
///
/// `Disconnected -> Connecting -> Connected`, with failures passing through
/// `Error` back to `Disconnected`. Connect attempts are serialized: callers
/// arriving while one is in flight share its result instead of issuing a new
/// provider request. Cloning is cheap and every clone drives the same state.
#[derive(Clone)]
pub struct WalletCoordinator {
    shared: Arc<Shared>,
}

impl WalletCoordinator {
    pub fn new(registry: ProviderRegistry, settings: &WalletSettings) -> Self {
        Self::with_options(
            registry,
            settings.supported_chains.clone(),
            Duration::from_millis(settings.connect_timeout_ms),
        )
    }

    /// An empty `supported_chains` accepts any chain.
    pub fn with_options(registry: ProviderRegistry, supported_chains: Vec<u64>, connect_timeout: Duration) -> Self {
        let (status_tx, _) = broadcast::channel(32);
        Self {
            shared: Arc::new(Shared {
                registry,
                supported_chains,
                connect_timeout,
                state: RwLock::new(CoordinatorState {
                    status: ConnectionStatus::Disconnected,
                    connection: None,
                    last_error: None,
                    in_flight: None,
                    cancel_requested: false,
                    generation: 0,
                    watcher: None,
                }),
                status_tx,
            }),
        }
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        self.shared.registry.ids()
    }

    pub fn supports_chain(&self, chain_id: u64) -> bool {
        self.shared.supported_chains.is_empty() || self.shared.supported_chains.contains(&chain_id)
    }

    /// Every status transition, including the transient `Error`.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.shared.state.read().await.status.clone()
    }

    pub async fn last_error(&self) -> Option<ConnectionError> {
        self.shared.state.read().await.last_error.clone()
    }

    /// `None` unless a session is fully established.
    pub async fn active_connection(&self) -> Option<WalletConnection> {
        let state = self.shared.state.read().await;
        match state.status {
            ConnectionStatus::Connected => state.connection.clone(),
            _ => None,
        }
    }

    pub async fn connect(&self, provider_id: &str) -> ConnectResult {
        let provider = match provider_id
            .parse::<ProviderId>()
            .ok()
            .and_then(|id| self.shared.registry.get(id))
        {
            Some(provider) => provider,
            None => {
                let err = ConnectionError::ProviderUnavailable(format!(
                    "no wallet provider registered for '{}'",
                    provider_id
                ));
                warn!("⚠️ {}", err);
                self.shared.state.write().await.last_error = Some(err.clone());
                return Err(err);
            }
        };
        let id = provider.id();

        let mut state = self.shared.state.write().await;

        if let Some(rx) = state.in_flight.clone() {
            drop(state);
            info!("⏳ Connect to {} requested while another attempt is in flight, sharing its result", id);
            return await_outcome(rx).await;
        }

        if let Some(connection) = state.connection.as_ref().filter(|c| c.provider == id) {
            debug!("👛 Already connected to {}", id);
            return Ok(connection.clone());
        }

        let previous = state.connection.take();
        if let Some(watcher) = state.watcher.take() {
            watcher.abort();
        }

        let (tx, rx) = watch::channel(None);
        state.in_flight = Some(rx.clone());
        state.cancel_requested = false;
        state.generation += 1;
        let generation = state.generation;
        self.set_status(&mut state, ConnectionStatus::Connecting);
        drop(state);

        info!("🔌 Connecting to {}", id);

        // The attempt owns its own task so a caller dropping its future
        // cannot leave the coordinator stuck in `Connecting`.
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_attempt(provider, previous, generation, tx).await;
        });

        await_outcome(rx).await
    }

    /// Clears the local session unconditionally. A failed remote revoke is
    /// logged and returned, but the coordinator is already `Disconnected`.
    /// While a connect is in flight the request is recorded and the attempt's
    /// result is discarded once it settles.
    pub async fn disconnect(&self) -> Result<(), DisconnectionError> {
        let mut state = self.shared.state.write().await;

        if state.in_flight.is_some() {
            state.cancel_requested = true;
            info!("🚫 Disconnect requested while connecting, the pending attempt will be discarded");
            return Ok(());
        }

        let connection = state.connection.take();
        state.generation += 1;
        if let Some(watcher) = state.watcher.take() {
            watcher.abort();
        }
        self.set_status(&mut state, ConnectionStatus::Disconnected);
        drop(state);

        match connection {
            Some(connection) => {
                info!("👋 Disconnected {} ({})", connection.short_address(), connection.provider);
                self.release_remote(&connection).await
            }
            None => Ok(()),
        }
    }

    /// Re-reads the native balance of the active account.
    pub async fn refresh_balance(&self) -> Result<Option<Decimal>, ConnectionError> {
        let (connection, generation) = {
            let state = self.shared.state.read().await;
            match (&state.status, &state.connection) {
                (ConnectionStatus::Connected, Some(c)) => (c.clone(), state.generation),
                _ => return Ok(None),
            }
        };

        let provider = self
            .shared
            .registry
            .get(connection.provider)
            .ok_or_else(|| ConnectionError::ProviderUnavailable(connection.provider.to_string()))?;
        let balance = provider.get_balance(&connection.address, connection.chain_id).await?;
        self.store_balance(generation, &connection.address, connection.chain_id, balance)
            .await;
        Ok(Some(balance))
    }

    async fn run_attempt(
        &self,
        provider: Arc<dyn WalletProvider>,
        previous: Option<WalletConnection>,
        generation: u64,
        tx: watch::Sender<Option<ConnectResult>>,
    ) {
        if let Some(previous) = previous {
            info!("🔁 Switching wallet from {} to {}", previous.provider, provider.id());
            self.release_in_background(previous);
        }

        let events = provider.subscribe();
        let outcome = match tokio::time::timeout(self.shared.connect_timeout, self.establish(provider.as_ref())).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ConnectionError::Timeout(self.shared.connect_timeout.as_millis() as u64)),
        };

        let mut state = self.shared.state.write().await;
        state.in_flight = None;

        let result = if state.cancel_requested {
            state.cancel_requested = false;
            state.connection = None;
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            info!("🚫 Discarded connection attempt to {} after disconnect", provider.id());
            Err(ConnectionError::Cancelled)
        } else {
            match &outcome {
                Ok(connection) => {
                    state.connection = Some(connection.clone());
                    state.last_error = None;
                    state.watcher = Some(self.spawn_watcher(provider.clone(), events, generation));
                    self.set_status(&mut state, ConnectionStatus::Connected);
                    info!(
                        "✅ Connected to {} as {} on {} ({})",
                        connection.provider,
                        connection.short_address(),
                        chain_name(connection.chain_id),
                        connection.chain_id
                    );
                    Ok(connection.clone())
                }
                Err(e) => {
                    warn!("❌ Connection to {} failed [{}]: {}", provider.id(), e.code(), e);
                    state.last_error = Some(e.clone());
                    self.set_status(&mut state, ConnectionStatus::Error(e.to_string()));
                    self.set_status(&mut state, ConnectionStatus::Disconnected);
                    Err(e.clone())
                }
            }
        };
        drop(state);

        if let (Ok(discarded), Err(ConnectionError::Cancelled)) = (outcome, &result) {
            self.release_in_background(discarded);
        }

        let _ = tx.send(Some(result));
    }

    async fn establish(&self, provider: &dyn WalletProvider) -> ConnectResult {
        let session = provider.request_connection().await?;

        let address = session
            .accounts
            .first()
            .cloned()
            .ok_or_else(|| ConnectionError::UserRejected("wallet granted no accounts".to_string()))?;

        if !self.supports_chain(session.chain_id) {
            return Err(ConnectionError::UnsupportedChain {
                chain_id: session.chain_id,
            });
        }

        let balance = match provider.get_balance(&address, session.chain_id).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("⚠️ Connected but could not read balance for {}: {}", address, e);
                Decimal::ZERO
            }
        };

        Ok(WalletConnection {
            provider: provider.id(),
            address,
            chain_id: session.chain_id,
            balance,
            connected_at: Utc::now(),
        })
    }

    /// Asks the wallet to revoke access, giving up after the connect timeout.
    async fn release_remote(&self, connection: &WalletConnection) -> Result<(), DisconnectionError> {
        let Some(provider) = self.shared.registry.get(connection.provider) else {
            return Ok(());
        };

        let timeout = self.shared.connect_timeout;
        let acknowledged = match tokio::time::timeout(timeout, provider.request_disconnection()).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(timeout.as_millis() as u64)),
        };
        acknowledged.map_err(|source| {
            warn!("⚠️ {} did not acknowledge disconnect: {}", connection.provider, source);
            DisconnectionError::Remote {
                provider: connection.provider,
                source,
            }
        })
    }

    /// Revokes a session that is no longer ours without holding up the caller.
    fn release_in_background(&self, connection: WalletConnection) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let _ = coordinator.release_remote(&connection).await;
        });
    }

    fn spawn_watcher(
        &self,
        provider: Arc<dyn WalletProvider>,
        mut events: broadcast::Receiver<ProviderEvent>,
        generation: u64,
    ) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !coordinator.apply_provider_event(provider.as_ref(), generation, event).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("⚠️ Missed {} wallet events from {}", skipped, provider.id());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("👛 Stopped watching {} (session {})", provider.id(), generation);
        })
    }

    /// Applies a wallet-side change to the active session. Returns false once
    /// the session this watcher belongs to is over.
    async fn apply_provider_event(&self, provider: &dyn WalletProvider, generation: u64, event: ProviderEvent) -> bool {
        let (address, chain_id) = {
            let mut state = self.shared.state.write().await;
            if state.generation != generation || state.connection.is_none() {
                return false;
            }

            let ended = match &event {
                ProviderEvent::Disconnected => true,
                ProviderEvent::AccountsChanged(accounts) => accounts.is_empty(),
                ProviderEvent::ChainChanged(_) => false,
            };
            if ended {
                state.connection = None;
                state.watcher = None;
                state.generation += 1;
                self.set_status(&mut state, ConnectionStatus::Disconnected);
                info!("🔌 {} ended the session from the wallet side", provider.id());
                return false;
            }

            let supported = match &event {
                ProviderEvent::ChainChanged(chain_id) => self.supports_chain(*chain_id),
                _ => true,
            };

            let Some(connection) = state.connection.as_mut() else {
                return false;
            };

            match event {
                ProviderEvent::AccountsChanged(accounts) => {
                    let Some(next) = accounts.into_iter().next() else {
                        return true;
                    };
                    if next.eq_ignore_ascii_case(&connection.address) {
                        return true;
                    }
                    info!("👛 Active account changed to {}", next);
                    connection.address = next;
                }
                ProviderEvent::ChainChanged(chain_id) => {
                    if chain_id == connection.chain_id {
                        return true;
                    }
                    if !supported {
                        warn!("⚠️ Wallet switched to unsupported chain {}", chain_id);
                    }
                    info!("⛓️ Active chain changed to {} ({})", chain_name(chain_id), chain_id);
                    connection.chain_id = chain_id;
                }
                ProviderEvent::Disconnected => return false,
            }

            (connection.address.clone(), connection.chain_id)
        };

        match provider.get_balance(&address, chain_id).await {
            Ok(balance) => self.store_balance(generation, &address, chain_id, balance).await,
            Err(e) => warn!("⚠️ Could not refresh balance after wallet change: {}", e),
        }
        true
    }

    async fn store_balance(&self, generation: u64, address: &str, chain_id: u64, balance: Decimal) {
        let mut state = self.shared.state.write().await;
        if state.generation != generation {
            return;
        }
        if let Some(connection) = state
            .connection
            .as_mut()
            .filter(|c| c.address == address && c.chain_id == chain_id)
        {
            connection.balance = balance;
        }
    }

    fn set_status(&self, state: &mut CoordinatorState, status: ConnectionStatus) {
        if state.status == status {
            return;
        }
        debug!("👛 Wallet status {} -> {}", state.status.label(), status.label());
        state.status = status.clone();
        let _ = self.shared.status_tx.send(status);
    }
}

async fn await_outcome(mut rx: watch::Receiver<Option<ConnectResult>>) -> ConnectResult {
    match rx.wait_for(Option::is_some).await {
        Ok(outcome) => outcome
            .clone()
            .unwrap_or_else(|| Err(ConnectionError::Unknown("connection attempt produced no result".to_string()))),
        Err(_) => Err(ConnectionError::Unknown("connection attempt was dropped".to_string())),
    }
}
