pub mod wallet;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Layer1,
    Layer2,
    Stablecoin,
    Defi,
    Meme,
    Nft,
    Other,
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetCategory::Layer1 => "layer1",
            AssetCategory::Layer2 => "layer2",
            AssetCategory::Stablecoin => "stablecoin",
            AssetCategory::Defi => "defi",
            AssetCategory::Meme => "meme",
            AssetCategory::Nft => "nft",
            AssetCategory::Other => "other",
        };
        f.write_str(label)
    }
}

/// A held token with its latest market data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    /// 24h price change in percent (2.5 means +2.5%).
    pub change_24h: f64,
    pub quantity: Decimal,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub volume_24h: Option<Decimal>,
    #[serde(default)]
    pub category: Option<AssetCategory>,
}

impl Asset {
    pub fn new(symbol: &str, name: &str, price: Decimal, quantity: Decimal, change_24h: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            change_24h,
            quantity,
            market_cap: None,
            volume_24h: None,
            category: None,
        }
    }

    pub fn with_category(mut self, category: AssetCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_market_data(mut self, market_cap: Decimal, volume_24h: Decimal) -> Self {
        self.market_cap = Some(market_cap);
        self.volume_24h = Some(volume_24h);
        self
    }

    pub fn value(&self) -> Decimal {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub symbol: String,
    pub value: Decimal,
    /// Share of the portfolio, 0..=100.
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Performer {
    pub symbol: String,
    pub change_24h: f64,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSnapshot {
    pub total_value: Decimal,
    pub change_24h_value: Decimal,
    pub change_24h_pct: f64,
    pub allocations: Vec<Allocation>,
    pub best_performer: Option<Performer>,
    pub worst_performer: Option<Performer>,
    pub top_performers: Vec<Performer>,
    pub asset_count: usize,
    pub taken_at: DateTime<Utc>,
}

impl Default for PortfolioSnapshot {
    fn default() -> Self {
        Self {
            total_value: Decimal::ZERO,
            change_24h_value: Decimal::ZERO,
            change_24h_pct: 0.0,
            allocations: Vec::new(),
            best_performer: None,
            worst_performer: None,
            top_performers: Vec::new(),
            asset_count: 0,
            taken_at: Utc::now(),
        }
    }
}

impl PortfolioSnapshot {
    pub fn allocation_of(&self, symbol: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
            .map(|a| a.percent)
    }

    pub fn is_empty(&self) -> bool {
        self.asset_count == 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
    Transfer,
    Swap,
    Stake,
    Unstake,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 6] = [
        TransactionKind::Buy,
        TransactionKind::Sell,
        TransactionKind::Transfer,
        TransactionKind::Swap,
        TransactionKind::Stake,
        TransactionKind::Unstake,
    ];
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Buy => "Buy",
            TransactionKind::Sell => "Sell",
            TransactionKind::Transfer => "Transfer",
            TransactionKind::Swap => "Swap",
            TransactionKind::Stake => "Stake",
            TransactionKind::Unstake => "Unstake",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainDetails {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub gas_fee: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub asset: String,
    pub amount: Decimal,
    pub value_usd: Decimal,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub chain: Option<ChainDetails>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DefiPositionKind {
    Lending,
    Borrowing,
    LiquidityPool,
    Staking,
    Farming,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefiPosition {
    pub protocol: String,
    pub kind: DefiPositionKind,
    pub asset: String,
    pub value: Decimal,
    pub apy: f64,
    #[serde(default)]
    pub rewards: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NftHolding {
    pub collection: String,
    pub token_id: String,
    pub floor_price: Decimal,
    #[serde(default)]
    pub last_sale: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub target_price: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "target", rename_all = "snake_case")]
pub enum AlertCondition {
    Above(Decimal),
    Below(Decimal),
    /// Absolute 24h move in percent.
    PercentMove(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub id: String,
    pub symbol: String,
    pub condition: AlertCondition,
    pub active: bool,
}

/// Tokens plus DeFi and NFT holdings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetWorth {
    pub tokens: Decimal,
    pub defi_supplied: Decimal,
    pub defi_borrowed: Decimal,
    pub defi_rewards: Decimal,
    pub nft_floor: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub metric: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub threshold: f64,
}
