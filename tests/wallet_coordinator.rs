use async_trait::async_trait;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};

use folio_deck::model::wallet::{ConnectionStatus, ProviderEvent, ProviderId, ProviderSession};
use folio_deck::wallet::{ConnectionError, DisconnectionError, ProviderRegistry, WalletCoordinator, WalletProvider};

const ADDRESS: &str = "0x1111111111111111111111111111111111111111";

/// Wallet whose answers are set by the test. With a gate, connection
/// requests block until `release` is called. A hung wallet never answers
/// disconnect requests.
struct ScriptedProvider {
    id: ProviderId,
    requests: AtomicUsize,
    disconnects: AtomicUsize,
    gate: Option<Semaphore>,
    outcome: Mutex<Result<ProviderSession, ConnectionError>>,
    disconnect_result: Mutex<Result<(), ConnectionError>>,
    hangs_on_disconnect: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl ScriptedProvider {
    fn new(id: ProviderId) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            id,
            requests: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            gate: None,
            outcome: Mutex::new(Ok(ProviderSession {
                accounts: vec![ADDRESS.to_string()],
                chain_id: 1,
            })),
            disconnect_result: Mutex::new(Ok(())),
            hangs_on_disconnect: AtomicBool::new(false),
            events,
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    fn answering(self, outcome: Result<ProviderSession, ConnectionError>) -> Self {
        *self.outcome.lock().unwrap() = outcome;
        self
    }

    fn hung(self) -> Self {
        self.hangs_on_disconnect.store(true, Ordering::SeqCst);
        self
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn request_connection(&self) -> Result<ProviderSession, ConnectionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.outcome.lock().unwrap().clone()
    }

    async fn request_disconnection(&self) -> Result<(), ConnectionError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.hangs_on_disconnect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.disconnect_result.lock().unwrap().clone()
    }

    async fn get_balance(&self, _address: &str, chain_id: u64) -> Result<Decimal, ConnectionError> {
        Ok(Decimal::from(chain_id))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

fn coordinator_with(providers: &[Arc<ScriptedProvider>]) -> WalletCoordinator {
    coordinator_with_options(providers, vec![], Duration::from_secs(5))
}

fn coordinator_with_options(
    providers: &[Arc<ScriptedProvider>],
    supported_chains: Vec<u64>,
    timeout: Duration,
) -> WalletCoordinator {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider.clone());
    }
    WalletCoordinator::with_options(registry, supported_chains, timeout)
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

async fn wait_for_status(coordinator: &WalletCoordinator, expected: ConnectionStatus) {
    eventually(|| {
        let coordinator = coordinator.clone();
        let expected = expected.clone();
        async move { coordinator.status().await == expected }
    })
    .await;
}

#[tokio::test]
async fn concurrent_connects_share_one_provider_request() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).gated());
    let coordinator = coordinator_with(&[metamask.clone()]);

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.connect("metamask").await })
    };
    wait_for_status(&coordinator, ConnectionStatus::Connecting).await;

    let second = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.connect("metamask").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    metamask.release();

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(metamask.requests(), 1);
    assert_eq!(first, second);
    assert_eq!(coordinator.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn disconnect_while_connecting_discards_successful_attempt() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).gated());
    let coordinator = coordinator_with(&[metamask.clone()]);

    let pending = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.connect("metamask").await })
    };
    wait_for_status(&coordinator, ConnectionStatus::Connecting).await;

    assert!(coordinator.disconnect().await.is_ok());
    metamask.release();

    assert_eq!(pending.await.unwrap(), Err(ConnectionError::Cancelled));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
    assert!(coordinator.active_connection().await.is_none());
    // The wallet granted access, so it is told to revoke it.
    eventually(|| {
        let metamask = metamask.clone();
        async move { metamask.disconnects() == 1 }
    })
    .await;
}

#[tokio::test]
async fn disconnect_while_connecting_discards_failed_attempt() {
    let metamask = Arc::new(
        ScriptedProvider::new(ProviderId::MetaMask)
            .gated()
            .answering(Err(ConnectionError::UserRejected("denied".to_string()))),
    );
    let coordinator = coordinator_with(&[metamask.clone()]);

    let pending = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.connect("metamask").await })
    };
    wait_for_status(&coordinator, ConnectionStatus::Connecting).await;

    coordinator.disconnect().await.unwrap();
    metamask.release();

    assert_eq!(pending.await.unwrap(), Err(ConnectionError::Cancelled));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
    assert_eq!(metamask.disconnects(), 0);
}

#[tokio::test]
async fn unknown_provider_is_unavailable() {
    let coordinator = coordinator_with(&[Arc::new(ScriptedProvider::new(ProviderId::MetaMask))]);

    let result = coordinator.connect("unknown-provider").await;

    assert!(matches!(result, Err(ConnectionError::ProviderUnavailable(_))));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
    assert!(matches!(
        coordinator.last_error().await,
        Some(ConnectionError::ProviderUnavailable(_))
    ));
}

#[tokio::test]
async fn rejected_connect_passes_through_error_state() {
    let metamask = Arc::new(
        ScriptedProvider::new(ProviderId::MetaMask)
            .answering(Err(ConnectionError::UserRejected("denied".to_string()))),
    );
    let coordinator = coordinator_with(&[metamask.clone()]);
    let mut statuses = coordinator.subscribe_status();

    let result = coordinator.connect("metamask").await;
    assert_eq!(result, Err(ConnectionError::UserRejected("denied".to_string())));

    let mut seen = Vec::new();
    while let Ok(status) = statuses.try_recv() {
        seen.push(status);
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], ConnectionStatus::Connecting);
    assert!(matches!(seen[1], ConnectionStatus::Error(_)));
    assert_eq!(seen[2], ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn slow_wallet_times_out() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).gated());
    let coordinator = coordinator_with_options(&[metamask.clone()], vec![], Duration::from_millis(50));

    let result = coordinator.connect("metamask").await;

    assert_eq!(result, Err(ConnectionError::Timeout(50)));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn unsupported_chain_is_rejected() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).answering(Ok(ProviderSession {
        accounts: vec![ADDRESS.to_string()],
        chain_id: 56,
    })));
    let coordinator = coordinator_with_options(&[metamask.clone()], vec![1, 137], Duration::from_secs(5));

    let result = coordinator.connect("metamask").await;

    assert_eq!(result, Err(ConnectionError::UnsupportedChain { chain_id: 56 }));
    assert!(coordinator.active_connection().await.is_none());
}

#[tokio::test]
async fn empty_account_grant_counts_as_rejection() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).answering(Ok(ProviderSession {
        accounts: vec![],
        chain_id: 1,
    })));
    let coordinator = coordinator_with(&[metamask]);

    assert!(matches!(
        coordinator.connect("metamask").await,
        Err(ConnectionError::UserRejected(_))
    ));
}

#[tokio::test]
async fn remote_disconnect_failure_still_clears_local_state() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with(&[metamask.clone()]);
    coordinator.connect("metamask").await.unwrap();

    *metamask.disconnect_result.lock().unwrap() = Err(ConnectionError::NetworkFailure("offline".to_string()));
    let result = coordinator.disconnect().await;

    assert!(matches!(
        result,
        Err(DisconnectionError::Remote {
            provider: ProviderId::MetaMask,
            ..
        })
    ));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
    assert!(coordinator.active_connection().await.is_none());
}

#[tokio::test]
async fn wallet_side_changes_update_the_active_connection() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with(&[metamask.clone()]);
    let connection = coordinator.connect("metamask").await.unwrap();
    assert_eq!(connection.address, ADDRESS);
    assert_eq!(connection.balance, Decimal::from(1));

    let next = "0x2222222222222222222222222222222222222222";
    metamask.emit(ProviderEvent::AccountsChanged(vec![next.to_string()]));
    eventually(|| {
        let coordinator = coordinator.clone();
        async move { coordinator.active_connection().await.map(|c| c.address) == Some(next.to_string()) }
    })
    .await;

    metamask.emit(ProviderEvent::ChainChanged(137));
    eventually(|| {
        let coordinator = coordinator.clone();
        async move {
            coordinator
                .active_connection()
                .await
                .map_or(false, |c| c.chain_id == 137 && c.balance == Decimal::from(137))
        }
    })
    .await;

    metamask.emit(ProviderEvent::AccountsChanged(vec![]));
    wait_for_status(&coordinator, ConnectionStatus::Disconnected).await;
    assert!(coordinator.active_connection().await.is_none());
}

#[tokio::test]
async fn provider_disconnect_event_ends_session() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with(&[metamask.clone()]);
    coordinator.connect("metamask").await.unwrap();

    metamask.emit(ProviderEvent::Disconnected);

    wait_for_status(&coordinator, ConnectionStatus::Disconnected).await;
}

#[tokio::test]
async fn switching_providers_releases_the_previous_wallet() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coinbase = Arc::new(ScriptedProvider::new(ProviderId::Coinbase));
    let coordinator = coordinator_with(&[metamask.clone(), coinbase.clone()]);

    coordinator.connect("metamask").await.unwrap();
    let switched = coordinator.connect("coinbase").await.unwrap();

    assert_eq!(switched.provider, ProviderId::Coinbase);
    eventually(|| {
        let metamask = metamask.clone();
        async move { metamask.disconnects() == 1 }
    })
    .await;
    assert_eq!(
        coordinator.active_connection().await.map(|c| c.provider),
        Some(ProviderId::Coinbase)
    );

    // Events from the old wallet no longer touch the session.
    metamask.emit(ProviderEvent::Disconnected);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(coordinator.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn connecting_again_to_the_same_wallet_reuses_the_session() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with(&[metamask.clone()]);

    let first = coordinator.connect("MetaMask").await.unwrap();
    let again = coordinator.connect("metamask").await.unwrap();

    assert_eq!(first, again);
    assert_eq!(metamask.requests(), 1);
}

#[tokio::test]
async fn reconnects_after_disconnect() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with(&[metamask.clone()]);

    coordinator.connect("metamask").await.unwrap();
    coordinator.disconnect().await.unwrap();
    coordinator.connect("metamask").await.unwrap();

    assert_eq!(metamask.requests(), 2);
    assert_eq!(coordinator.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn no_active_connection_while_connecting() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).gated());
    let coordinator = coordinator_with(&[metamask.clone()]);

    let pending = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.connect("metamask").await })
    };
    wait_for_status(&coordinator, ConnectionStatus::Connecting).await;
    assert!(coordinator.active_connection().await.is_none());

    metamask.release();
    let connection = pending.await.unwrap().unwrap();
    assert_eq!(coordinator.active_connection().await, Some(connection));
}

#[tokio::test]
async fn refresh_balance_requires_a_session() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with(&[metamask]);

    assert_eq!(coordinator.refresh_balance().await, Ok(None));
    coordinator.connect("metamask").await.unwrap();
    assert_eq!(coordinator.refresh_balance().await, Ok(Some(Decimal::from(1))));
}

#[tokio::test]
async fn disconnect_during_connect_that_times_out_is_cancelled() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).gated());
    let coordinator = coordinator_with_options(&[metamask.clone()], vec![], Duration::from_millis(100));

    let pending = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.connect("metamask").await })
    };
    wait_for_status(&coordinator, ConnectionStatus::Connecting).await;

    assert!(coordinator.disconnect().await.is_ok());

    assert_eq!(pending.await.unwrap(), Err(ConnectionError::Cancelled));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
    assert!(coordinator.active_connection().await.is_none());
    assert_eq!(metamask.disconnects(), 0);
}

#[tokio::test]
async fn switching_away_from_a_hung_wallet_still_connects() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).hung());
    let coinbase = Arc::new(ScriptedProvider::new(ProviderId::Coinbase));
    let coordinator = coordinator_with_options(&[metamask.clone(), coinbase.clone()], vec![], Duration::from_millis(50));
    coordinator.connect("metamask").await.unwrap();

    let switched = tokio::time::timeout(Duration::from_secs(2), coordinator.connect("coinbase"))
        .await
        .expect("switch settled");

    assert_eq!(switched.map(|c| c.provider), Ok(ProviderId::Coinbase));
    assert_eq!(coordinator.status().await, ConnectionStatus::Connected);
}

#[tokio::test]
async fn timed_out_switch_from_a_hung_wallet_leaves_coordinator_usable() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).hung());
    let coinbase = Arc::new(ScriptedProvider::new(ProviderId::Coinbase).gated());
    let coordinator = coordinator_with_options(&[metamask.clone(), coinbase.clone()], vec![], Duration::from_millis(50));
    coordinator.connect("metamask").await.unwrap();

    let switched = tokio::time::timeout(Duration::from_secs(2), coordinator.connect("coinbase"))
        .await
        .expect("switch settled");
    assert_eq!(switched, Err(ConnectionError::Timeout(50)));
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);

    let again = tokio::time::timeout(Duration::from_secs(2), coordinator.connect("metamask"))
        .await
        .expect("reconnect settled");
    assert!(again.is_ok());
    assert_eq!(metamask.requests(), 2);
}

#[tokio::test]
async fn disconnect_gives_up_on_a_hung_wallet() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask).hung());
    let coordinator = coordinator_with_options(&[metamask.clone()], vec![], Duration::from_millis(50));
    coordinator.connect("metamask").await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), coordinator.disconnect())
        .await
        .expect("disconnect settled");

    assert_eq!(
        result,
        Err(DisconnectionError::Remote {
            provider: ProviderId::MetaMask,
            source: ConnectionError::Timeout(50),
        })
    );
    assert_eq!(coordinator.status().await, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn unsupported_chain_change_keeps_the_session() {
    let metamask = Arc::new(ScriptedProvider::new(ProviderId::MetaMask));
    let coordinator = coordinator_with_options(&[metamask.clone()], vec![1, 137], Duration::from_secs(5));
    coordinator.connect("metamask").await.unwrap();

    metamask.emit(ProviderEvent::ChainChanged(56));
    eventually(|| {
        let coordinator = coordinator.clone();
        async move {
            coordinator
                .active_connection()
                .await
                .map_or(false, |c| c.chain_id == 56 && c.balance == Decimal::from(56))
        }
    })
    .await;

    assert!(!coordinator.supports_chain(56));
    assert_eq!(coordinator.status().await, ConnectionStatus::Connected);
}
