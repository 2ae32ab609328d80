use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    MetaMask,
    Coinbase,
    WalletConnect,
    Phantom,
    Demo,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::MetaMask,
        ProviderId::Coinbase,
        ProviderId::WalletConnect,
        ProviderId::Phantom,
        ProviderId::Demo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::MetaMask => "metamask",
            ProviderId::Coinbase => "coinbase",
            ProviderId::WalletConnect => "walletconnect",
            ProviderId::Phantom => "phantom",
            ProviderId::Demo => "demo",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown wallet provider '{}'", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

impl ConnectionStatus {
    pub fn label(&self) -> &str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Error(_) => "Error",
        }
    }
}

/// The active link to a user's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletConnection {
    pub provider: ProviderId,
    pub address: String,
    pub chain_id: u64,
    /// Native balance in whole units (ETH, SOL, ...).
    pub balance: Decimal,
    pub connected_at: DateTime<Utc>,
}

impl WalletConnection {
    pub fn short_address(&self) -> String {
        let chars: Vec<char> = self.address.chars().collect();
        if chars.len() <= 12 {
            return self.address.clone();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

/// What a provider hands back after the user approves a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    pub accounts: Vec<String>,
    pub chain_id: u64,
}

/// Notifications pushed by a provider after connecting.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(u64),
    Disconnected,
}

pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        1 => "Ethereum",
        10 => "Optimism",
        56 => "BNB Chain",
        101 => "Solana",
        137 => "Polygon",
        8453 => "Base",
        42161 => "Arbitrum",
        11155111 => "Sepolia",
        _ => "Unknown",
    }
}
