use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::api::backend::Table;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

/// One row-level change pushed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub table: Table,
    pub event: ChangeEvent,
    /// New row for inserts and updates, the removed row for deletes.
    pub record: Value,
}

/// Subscribes to row changes for the user's tables over the backend's
/// realtime websocket and rebroadcasts them.
pub struct RealtimeFeed {
    url: String,
    api_key: String,
    user_id: String,
    sender: broadcast::Sender<RowChange>,
    connected: Arc<AtomicBool>,
}

impl RealtimeFeed {
    pub fn new(url: String, api_key: String, user_id: String) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            url,
            api_key,
            user_id,
            sender,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RowChange> {
        self.sender.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub async fn connect_and_subscribe(&self, tables: &[Table]) -> Result<()> {
        let ws_url = if self.api_key.is_empty() {
            self.url.clone()
        } else {
            format!("{}?apikey={}&vsn=1.0.0", self.url, self.api_key)
        };
        info!("🔌 Connecting to realtime feed: {}", self.url);

        let (ws_stream, _) = connect_async(ws_url.as_str()).await?;
        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        self.connected.store(true, Ordering::Relaxed);
        info!("✅ Realtime feed connected");

        for (n, table) in tables.iter().enumerate() {
            let join = join_message(*table, &self.user_id, n + 1);
            ws_sink.send(Message::Text(join.to_string())).await?;
            info!("📡 Subscribed to {} changes", table);
        }

        let sender = self.sender.clone();
        let connected = self.connected.clone();

        tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
            heartbeat.tick().await;

            loop {
                tokio::select! {
                    _ = heartbeat.tick() => {
                        let beat = json!({"topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": "hb"});
                        if let Err(e) = ws_sink.send(Message::Text(beat.to_string())).await {
                            error!("❌ Realtime heartbeat failed: {}", e);
                            break;
                        }
                    }
                    msg = ws_stream.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(change) = parse_change(&text) {
                                debug!("📨 {:?} on {}", change.event, change.table);
                                if sender.send(change).is_err() {
                                    debug!("No realtime receivers active");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            warn!("🔌 Realtime feed closed");
                            break;
                        }
                        Some(Err(e)) => {
                            error!("❌ Realtime feed error: {}", e);
                            break;
                        }
                        _ => {}
                    }
                }
            }

            connected.store(false, Ordering::Relaxed);
        });

        Ok(())
    }
}

fn join_message(table: Table, user_id: &str, join_ref: usize) -> Value {
    json!({
        "topic": format!("realtime:public:{}", table),
        "event": "phx_join",
        "payload": {
            "config": {
                "postgres_changes": [{
                    "event": "*",
                    "schema": "public",
                    "table": table.as_str(),
                    "filter": format!("user_id=eq.{}", user_id),
                }]
            }
        },
        "ref": join_ref.to_string(),
    })
}

/// Extracts a row change from a realtime frame. Replies, heartbeats and
/// changes to unknown tables yield `None`.
pub fn parse_change(text: &str) -> Option<RowChange> {
    let msg: Value = serde_json::from_str(text).ok()?;
    let payload = msg.get("payload")?;
    let data = payload.get("data").unwrap_or(payload);

    let event = match data.get("type").or_else(|| msg.get("event")).and_then(Value::as_str)? {
        "INSERT" => ChangeEvent::Insert,
        "UPDATE" => ChangeEvent::Update,
        "DELETE" => ChangeEvent::Delete,
        _ => return None,
    };

    let table = data.get("table").and_then(Value::as_str).and_then(Table::from_name)?;
    let record = match event {
        ChangeEvent::Delete => data.get("old_record"),
        _ => data.get("record"),
    }
    .cloned()
    .unwrap_or(Value::Null);

    Some(RowChange { table, event, record })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_postgres_change_frames() {
        let frame = json!({
            "topic": "realtime:public:assets",
            "event": "postgres_changes",
            "payload": {
                "data": {
                    "type": "UPDATE",
                    "table": "assets",
                    "record": {"symbol": "BTC", "quantity": 1.5}
                }
            }
        });
        let change = parse_change(&frame.to_string()).unwrap();
        assert_eq!(change.table, Table::Assets);
        assert_eq!(change.event, ChangeEvent::Update);
        assert_eq!(change.record["symbol"], json!("BTC"));
    }

    #[test]
    fn delete_carries_old_record() {
        let frame = json!({
            "event": "DELETE",
            "payload": {"table": "price_alerts", "old_record": {"id": "a1"}}
        });
        let change = parse_change(&frame.to_string()).unwrap();
        assert_eq!(change.event, ChangeEvent::Delete);
        assert_eq!(change.record, json!({"id": "a1"}));
    }

    #[test]
    fn ignores_replies_and_unknown_tables() {
        let reply = json!({"event": "phx_reply", "payload": {"status": "ok"}});
        assert!(parse_change(&reply.to_string()).is_none());

        let other = json!({"event": "INSERT", "payload": {"table": "profiles", "record": {}}});
        assert!(parse_change(&other.to_string()).is_none());
        assert!(parse_change("not json").is_none());
    }

    #[test]
    fn join_filters_by_user() {
        let join = join_message(Table::Transactions, "user-1", 2);
        assert_eq!(join["topic"], json!("realtime:public:transactions"));
        assert_eq!(join["payload"]["config"]["postgres_changes"][0]["filter"], json!("user_id=eq.user-1"));
        assert_eq!(join["ref"], json!("2"));
    }
}
