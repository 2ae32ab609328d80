use futures_util::StreamExt;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::model::wallet::ProviderEvent;
use crate::wallet::rpc::parse_hex_quantity;

/// Relays wallet notifications from a bridge websocket onto a broadcast
/// channel. The socket is opened lazily on the first `ensure_listening`.
pub struct EventStream {
    url: Option<String>,
    sender: broadcast::Sender<ProviderEvent>,
    listening: Arc<AtomicBool>,
}

impl EventStream {
    pub fn new(url: Option<String>) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            url,
            sender,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.sender.subscribe()
    }

    pub async fn ensure_listening(&self) {
        let Some(url) = self.url.clone() else {
            return;
        };
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("🔌 Connecting to wallet event stream: {}", url);
        let (ws_stream, _) = match connect_async(url.as_str()).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("⚠️ Wallet event stream unavailable ({}), account changes will not be tracked", e);
                self.listening.store(false, Ordering::SeqCst);
                return;
            }
        };
        let (_sink, mut stream) = ws_stream.split();

        let sender = self.sender.clone();
        let listening = self.listening.clone();

        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => match parse_wallet_event(&text) {
                        Some(event) => {
                            debug!("👛 Wallet event: {:?}", event);
                            let _ = sender.send(event);
                        }
                        None => debug!("👛 Ignoring wallet message: {}", text),
                    },
                    Ok(Message::Close(_)) => {
                        info!("🔌 Wallet event stream closed");
                        break;
                    }
                    Err(e) => {
                        warn!("⚠️ Wallet event stream error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            listening.store(false, Ordering::SeqCst);
        });
    }
}

/// Understands EIP-1193 style `accountsChanged` / `chainChanged` /
/// `disconnect` and the Solana wallet `accountChanged` notification.
pub fn parse_wallet_event(text: &str) -> Option<ProviderEvent> {
    let value: Value = serde_json::from_str(text).ok()?;
    let event = value.get("event").and_then(Value::as_str)?;
    let data = value.get("data").cloned().unwrap_or(Value::Null);

    match event {
        "accountsChanged" => {
            let accounts = data
                .as_array()?
                .iter()
                .filter_map(|a| a.as_str().map(str::to_string))
                .collect();
            Some(ProviderEvent::AccountsChanged(accounts))
        }
        "accountChanged" => match data.as_str() {
            Some(account) => Some(ProviderEvent::AccountsChanged(vec![account.to_string()])),
            None => Some(ProviderEvent::AccountsChanged(Vec::new())),
        },
        "chainChanged" => {
            let chain_id = match &data {
                Value::String(s) => u64::try_from(parse_hex_quantity(s).or_else(|| s.parse().ok())?).ok()?,
                Value::Number(n) => n.as_u64()?,
                _ => return None,
            };
            Some(ProviderEvent::ChainChanged(chain_id))
        }
        "disconnect" => Some(ProviderEvent::Disconnected),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_evm_notifications() {
        assert_eq!(
            parse_wallet_event(r#"{"event":"accountsChanged","data":["0xabc","0xdef"]}"#),
            Some(ProviderEvent::AccountsChanged(vec!["0xabc".to_string(), "0xdef".to_string()]))
        );
        assert_eq!(
            parse_wallet_event(r#"{"event":"chainChanged","data":"0x89"}"#),
            Some(ProviderEvent::ChainChanged(137))
        );
        assert_eq!(parse_wallet_event(r#"{"event":"disconnect"}"#), Some(ProviderEvent::Disconnected));
    }

    #[test]
    fn parses_solana_account_change() {
        assert_eq!(
            parse_wallet_event(r#"{"event":"accountChanged","data":null}"#),
            Some(ProviderEvent::AccountsChanged(Vec::new()))
        );
    }

    #[test]
    fn oversized_chain_id_is_dropped() {
        assert_eq!(
            parse_wallet_event(r#"{"event":"chainChanged","data":"0x10000000000000001"}"#),
            None
        );
        assert_eq!(
            parse_wallet_event(r#"{"event":"chainChanged","data":"0xffffffffffffffff"}"#),
            Some(ProviderEvent::ChainChanged(u64::MAX))
        );
    }

    #[test]
    fn ignores_unknown_messages() {
        assert_eq!(parse_wallet_event(r#"{"event":"message","data":{}}"#), None);
        assert_eq!(parse_wallet_event("not json"), None);
    }
}
