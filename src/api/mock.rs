use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use rand::Rng;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::api::provider::{DataSourceStatus, PortfolioSource};
use crate::model::*;

struct Seed {
    symbol: &'static str,
    name: &'static str,
    price: Decimal,
    quantity: Decimal,
    change_24h: f64,
    category: AssetCategory,
    market_cap: Decimal,
    volume_24h: Decimal,
}

fn seeds() -> Vec<Seed> {
    vec![
        Seed {
            symbol: "BTC",
            name: "Bitcoin",
            price: dec!(43000),
            quantity: dec!(0.85),
            change_24h: 2.4,
            category: AssetCategory::Layer1,
            market_cap: dec!(845000000000),
            volume_24h: dec!(28500000000),
        },
        Seed {
            symbol: "ETH",
            name: "Ethereum",
            price: dec!(2600),
            quantity: dec!(6.4),
            change_24h: -1.3,
            category: AssetCategory::Layer1,
            market_cap: dec!(312000000000),
            volume_24h: dec!(15200000000),
        },
        Seed {
            symbol: "SOL",
            name: "Solana",
            price: dec!(98.5),
            quantity: dec!(120),
            change_24h: 6.8,
            category: AssetCategory::Layer1,
            market_cap: dec!(42500000000),
            volume_24h: dec!(2100000000),
        },
        Seed {
            symbol: "ARB",
            name: "Arbitrum",
            price: dec!(1.85),
            quantity: dec!(2400),
            change_24h: -4.2,
            category: AssetCategory::Layer2,
            market_cap: dec!(2350000000),
            volume_24h: dec!(480000000),
        },
        Seed {
            symbol: "UNI",
            name: "Uniswap",
            price: dec!(6.2),
            quantity: dec!(350),
            change_24h: 11.5,
            category: AssetCategory::Defi,
            market_cap: dec!(3700000000),
            volume_24h: dec!(140000000),
        },
        Seed {
            symbol: "USDC",
            name: "USD Coin",
            price: dec!(1),
            quantity: dec!(5200),
            change_24h: 0.01,
            category: AssetCategory::Stablecoin,
            market_cap: dec!(25000000000),
            volume_24h: dec!(5600000000),
        },
        Seed {
            symbol: "PEPE",
            name: "Pepe",
            price: dec!(0.0000012),
            quantity: dec!(850000000),
            change_24h: -14.6,
            category: AssetCategory::Meme,
            market_cap: dec!(505000000),
            volume_24h: dec!(96000000),
        },
    ]
}

/// Demo-mode data source. Prices drift around fixed seed values on every
/// read so the dashboard has something to move.
pub struct MockSource {
    counter: AtomicU32,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
        }
    }

    pub fn generate_assets(&self) -> Vec<Asset> {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let time_factor = (counter as f64 * 0.1).sin();
        let mut rng = rand::thread_rng();

        let assets: Vec<Asset> = seeds()
            .into_iter()
            .map(|seed| {
                let jitter: f64 = rng.gen_range(-0.01..0.01);
                let drift = Decimal::from_f64(1.0 + jitter + time_factor * 0.005).unwrap_or(Decimal::ONE);
                let price = (seed.price * drift).round_dp(8).normalize();
                let change = seed.change_24h + time_factor * 1.5 + rng.gen_range(-0.5..0.5);

                Asset::new(seed.symbol, seed.name, price, seed.quantity, (change * 100.0).round() / 100.0)
                    .with_category(seed.category)
                    .with_market_data(seed.market_cap, seed.volume_24h)
            })
            .collect();

        debug!("🧪 Generated demo prices #{} for {} assets", counter, assets.len());
        assets
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

fn demo_transactions() -> Vec<Transaction> {
    let now = Utc::now();
    let entries = [
        ("tx-1", TransactionKind::Buy, "BTC", dec!(0.25), dec!(10750), 2, TransactionStatus::Completed),
        ("tx-2", TransactionKind::Swap, "ETH", dec!(1.5), dec!(3900), 5, TransactionStatus::Completed),
        ("tx-3", TransactionKind::Stake, "SOL", dec!(40), dec!(3940), 9, TransactionStatus::Completed),
        ("tx-4", TransactionKind::Transfer, "USDC", dec!(1200), dec!(1200), 20, TransactionStatus::Pending),
        ("tx-5", TransactionKind::Sell, "PEPE", dec!(150000000), dec!(180), 30, TransactionStatus::Failed),
        ("tx-6", TransactionKind::Buy, "UNI", dec!(100), dec!(620), 48, TransactionStatus::Completed),
    ];

    entries
        .into_iter()
        .map(|(id, kind, asset, amount, value_usd, hours_ago, status)| Transaction {
            id: id.to_string(),
            kind,
            asset: asset.to_string(),
            amount,
            value_usd,
            timestamp: now - Duration::hours(hours_ago),
            status,
            chain: Some(ChainDetails {
                hash: format!("0x{:0>64}", id.trim_start_matches("tx-")),
                from: crate::wallet::demo::DEMO_ADDRESS.to_string(),
                to: "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45".to_string(),
                gas_fee: dec!(0.0021),
            }),
        })
        .collect()
}

#[async_trait]
impl PortfolioSource for MockSource {
    async fn get_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.generate_assets())
    }

    async fn get_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(demo_transactions())
    }

    async fn get_defi_positions(&self) -> Result<Vec<DefiPosition>> {
        Ok(vec![
            DefiPosition {
                protocol: "Aave".to_string(),
                kind: DefiPositionKind::Lending,
                asset: "USDC".to_string(),
                value: dec!(8000),
                apy: 4.2,
                rewards: dec!(38.5),
            },
            DefiPosition {
                protocol: "Aave".to_string(),
                kind: DefiPositionKind::Borrowing,
                asset: "ETH".to_string(),
                value: dec!(2600),
                apy: 2.9,
                rewards: Decimal::ZERO,
            },
            DefiPosition {
                protocol: "Uniswap V3".to_string(),
                kind: DefiPositionKind::LiquidityPool,
                asset: "ETH/USDC".to_string(),
                value: dec!(5400),
                apy: 18.6,
                rewards: dec!(112.4),
            },
            DefiPosition {
                protocol: "Lido".to_string(),
                kind: DefiPositionKind::Staking,
                asset: "ETH".to_string(),
                value: dec!(7800),
                apy: 3.8,
                rewards: dec!(21.7),
            },
        ])
    }

    async fn get_nfts(&self) -> Result<Vec<NftHolding>> {
        Ok(vec![
            NftHolding {
                collection: "Pudgy Penguins".to_string(),
                token_id: "4821".to_string(),
                floor_price: dec!(24500),
                last_sale: Some(dec!(22800)),
            },
            NftHolding {
                collection: "Azuki".to_string(),
                token_id: "9120".to_string(),
                floor_price: dec!(14300),
                last_sale: None,
            },
        ])
    }

    async fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        let now = Utc::now();
        Ok(vec![
            WatchlistEntry {
                symbol: "AVAX".to_string(),
                added_at: now - Duration::days(3),
                target_price: Some(dec!(40)),
            },
            WatchlistEntry {
                symbol: "LINK".to_string(),
                added_at: now - Duration::days(10),
                target_price: None,
            },
        ])
    }

    async fn get_price_alerts(&self) -> Result<Vec<PriceAlert>> {
        Ok(vec![
            PriceAlert {
                id: "alert-btc".to_string(),
                symbol: "BTC".to_string(),
                condition: AlertCondition::Above(dec!(43500)),
                active: true,
            },
            PriceAlert {
                id: "alert-pepe".to_string(),
                symbol: "PEPE".to_string(),
                condition: AlertCondition::PercentMove(12.0),
                active: true,
            },
            PriceAlert {
                id: "alert-eth".to_string(),
                symbol: "ETH".to_string(),
                condition: AlertCondition::Below(dec!(2000)),
                active: false,
            },
        ])
    }

    async fn get_status(&self) -> DataSourceStatus {
        DataSourceStatus::Connected
    }
}
