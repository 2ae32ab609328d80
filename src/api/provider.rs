use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DataSourceStatus {
    Connected,
    Disconnected,
    Error(String),
}

/// Where the dashboard reads holdings from: the hosted backend in live mode,
/// generated data in demo mode.
#[async_trait]
pub trait PortfolioSource: Send + Sync {
    async fn get_assets(&self) -> Result<Vec<Asset>>;
    async fn get_transactions(&self) -> Result<Vec<Transaction>>;
    async fn get_defi_positions(&self) -> Result<Vec<DefiPosition>>;
    async fn get_nfts(&self) -> Result<Vec<NftHolding>>;
    async fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>>;
    async fn get_price_alerts(&self) -> Result<Vec<PriceAlert>>;
    async fn get_status(&self) -> DataSourceStatus;
}

/// Lenient decimal parsing for numbers the backend sends as strings.
pub fn parse_decimal(s: &str) -> Decimal {
    s.trim().parse().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_decimal_falls_back_to_zero() {
        assert_eq!(parse_decimal(" 42.5 "), dec!(42.5));
        assert_eq!(parse_decimal("n/a"), Decimal::ZERO);
    }
}
