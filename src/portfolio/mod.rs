use crate::model::*;
use chrono::Utc;
use rust_decimal::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

pub mod filter;
pub mod sort;
pub mod transactions;

pub use filter::{filter_assets, search_and_rank, FilterCriteria, PerformanceBucket};
pub use sort::{sort_assets, SortDirection, SortKey};

pub const DEFAULT_TOP_PERFORMERS: usize = 5;

/// Aggregation degrades to zeroed or empty values instead of failing, so no
/// public operation returns this. Parsing helpers use it internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("invalid numeric bound: {0}")]
    InvalidBound(String),
}

pub fn compute_snapshot(assets: &[Asset]) -> PortfolioSnapshot {
    compute_snapshot_with(assets, DEFAULT_TOP_PERFORMERS)
}

pub fn compute_snapshot_with(assets: &[Asset], top_n: usize) -> PortfolioSnapshot {
    if assets.is_empty() {
        return PortfolioSnapshot::default();
    }

    let total_value = assets.iter().map(Asset::value).sum::<Decimal>();

    let allocations = assets
        .iter()
        .map(|asset| {
            let value = asset.value();
            Allocation {
                symbol: asset.symbol.clone(),
                value,
                percent: share_percent(value, total_value),
            }
        })
        .collect();

    let change_24h_value = assets.iter().map(absolute_change_24h).sum::<Decimal>();

    PortfolioSnapshot {
        total_value,
        change_24h_value,
        change_24h_pct: weighted_change_pct(assets, total_value),
        allocations,
        best_performer: best_performer(assets),
        worst_performer: worst_performer(assets),
        top_performers: top_performers(assets, top_n),
        asset_count: assets.len(),
        taken_at: Utc::now(),
    }
}

/// Value-weighted average of per-asset 24h change.
pub fn weighted_change_pct(assets: &[Asset], total_value: Decimal) -> f64 {
    let total = total_value.to_f64().unwrap_or(0.0);
    if total <= 0.0 {
        return 0.0;
    }

    let weighted = assets
        .iter()
        .map(|asset| asset.value().to_f64().unwrap_or(0.0) * finite_or_zero(asset.change_24h))
        .sum::<f64>();

    weighted / total
}

/// Value gained over the last 24h, backing the previous value out of the
/// current one and the percent change.
fn absolute_change_24h(asset: &Asset) -> Decimal {
    let value = asset.value();
    let factor = 1.0 + finite_or_zero(asset.change_24h) / 100.0;
    if factor <= 0.0 {
        return Decimal::ZERO;
    }

    Decimal::from_f64(factor)
        .and_then(|f| value.checked_div(f))
        .map(|previous| value - previous)
        .unwrap_or(Decimal::ZERO)
}

fn share_percent(value: Decimal, total: Decimal) -> f64 {
    if total <= Decimal::ZERO {
        return 0.0;
    }
    value
        .checked_div(total)
        .and_then(|share| share.to_f64())
        .map(|share| share * 100.0)
        .unwrap_or(0.0)
}

/// Non-finite values and negative zero collapse to zero.
pub(crate) fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() && x != 0.0 { x } else { 0.0 }
}

fn performer(asset: &Asset) -> Performer {
    Performer {
        symbol: asset.symbol.clone(),
        change_24h: finite_or_zero(asset.change_24h),
        value: asset.value(),
    }
}

pub fn best_performer(assets: &[Asset]) -> Option<Performer> {
    let mut best: Option<&Asset> = None;
    for asset in assets {
        match best {
            Some(current) if finite_or_zero(asset.change_24h) <= finite_or_zero(current.change_24h) => {}
            _ => best = Some(asset),
        }
    }
    best.map(performer)
}

pub fn worst_performer(assets: &[Asset]) -> Option<Performer> {
    let mut worst: Option<&Asset> = None;
    for asset in assets {
        match worst {
            Some(current) if finite_or_zero(asset.change_24h) >= finite_or_zero(current.change_24h) => {}
            _ => worst = Some(asset),
        }
    }
    worst.map(performer)
}

/// Up to `n` assets by 24h change, highest first. Ties keep input order.
pub fn top_performers(assets: &[Asset], n: usize) -> Vec<Performer> {
    ranked_by_change(assets, n, |a, b| b.total_cmp(&a))
}

/// Up to `n` assets by 24h change, lowest first. Ties keep input order.
pub fn worst_performers(assets: &[Asset], n: usize) -> Vec<Performer> {
    ranked_by_change(assets, n, |a, b| a.total_cmp(&b))
}

fn ranked_by_change<F>(assets: &[Asset], n: usize, cmp: F) -> Vec<Performer>
where
    F: Fn(f64, f64) -> Ordering,
{
    let mut ranked: Vec<&Asset> = assets.iter().collect();
    ranked.sort_by(|a, b| cmp(finite_or_zero(a.change_24h), finite_or_zero(b.change_24h)));
    ranked.into_iter().take(n).map(performer).collect()
}

/// Percent of portfolio value per category. Uncategorised assets land in
/// `Other`.
pub fn allocation_by_category(assets: &[Asset]) -> HashMap<AssetCategory, f64> {
    let total = assets.iter().map(Asset::value).sum::<Decimal>();
    let mut by_category: HashMap<AssetCategory, Decimal> = HashMap::new();

    for asset in assets {
        let category = asset.category.unwrap_or(AssetCategory::Other);
        *by_category.entry(category).or_insert(Decimal::ZERO) += asset.value();
    }

    by_category
        .into_iter()
        .map(|(category, value)| (category, share_percent(value, total)))
        .collect()
}

pub fn compute_net_worth(
    snapshot: &PortfolioSnapshot,
    positions: &[DefiPosition],
    nfts: &[NftHolding],
) -> NetWorth {
    let defi_borrowed = positions
        .iter()
        .filter(|p| p.kind == DefiPositionKind::Borrowing)
        .map(|p| p.value)
        .sum::<Decimal>();

    let defi_supplied = positions
        .iter()
        .filter(|p| p.kind != DefiPositionKind::Borrowing)
        .map(|p| p.value)
        .sum::<Decimal>();

    let defi_rewards = positions.iter().map(|p| p.rewards).sum::<Decimal>();
    let nft_floor = nfts.iter().map(|n| n.floor_price).sum::<Decimal>();

    NetWorth {
        tokens: snapshot.total_value,
        defi_supplied,
        defi_borrowed,
        defi_rewards,
        nft_floor,
        total: snapshot.total_value + defi_supplied + defi_rewards + nft_floor - defi_borrowed,
    }
}

/// Average APY across DeFi positions, weighted by position value.
pub fn weighted_apy(positions: &[DefiPosition]) -> f64 {
    let total = positions.iter().map(|p| p.value.to_f64().unwrap_or(0.0)).sum::<f64>();
    if total <= 0.0 {
        return 0.0;
    }

    positions
        .iter()
        .map(|p| p.value.to_f64().unwrap_or(0.0) * finite_or_zero(p.apy))
        .sum::<f64>()
        / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_eth() -> Vec<Asset> {
        vec![
            Asset::new("BTC", "Bitcoin", dec!(43000), dec!(1), 2.0),
            Asset::new("ETH", "Ethereum", dec!(2500), dec!(2), -4.0),
        ]
    }

    fn round2(x: f64) -> f64 {
        (x * 100.0).round() / 100.0
    }

    #[test]
    fn snapshot_matches_reference_portfolio() {
        let snapshot = compute_snapshot(&btc_eth());

        assert_eq!(snapshot.total_value, dec!(48000));
        assert_eq!(round2(snapshot.allocation_of("BTC").unwrap()), 89.58);
        assert_eq!(round2(snapshot.allocation_of("ETH").unwrap()), 10.42);
        assert_eq!(snapshot.best_performer.as_ref().unwrap().symbol, "BTC");
        assert_eq!(snapshot.worst_performer.as_ref().unwrap().symbol, "ETH");
        assert_eq!(snapshot.asset_count, 2);
    }

    #[test]
    fn change_is_value_weighted() {
        let snapshot = compute_snapshot(&btc_eth());
        let expected = (43000.0 * 2.0 + 5000.0 * -4.0) / 48000.0;

        assert!((snapshot.change_24h_pct - expected).abs() < 1e-9);
    }

    #[test]
    fn absolute_change_backs_out_previous_value() {
        let assets = vec![Asset::new("SOL", "Solana", dec!(110), dec!(10), 10.0)];
        let snapshot = compute_snapshot(&assets);

        // 1100 now, 1000 a day ago.
        assert!((snapshot.change_24h_value - dec!(100)).abs() < dec!(0.0001));
    }

    #[test]
    fn empty_input_yields_zero_snapshot() {
        let snapshot = compute_snapshot(&[]);

        assert_eq!(snapshot.total_value, Decimal::ZERO);
        assert_eq!(snapshot.change_24h_pct, 0.0);
        assert!(snapshot.allocations.is_empty());
        assert!(snapshot.best_performer.is_none());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn zero_total_value_gives_zero_allocations() {
        let assets = vec![
            Asset::new("BTC", "Bitcoin", dec!(43000), dec!(0), 2.0),
            Asset::new("DOGE", "Dogecoin", dec!(0), dec!(5000), 8.0),
        ];
        let snapshot = compute_snapshot(&assets);

        assert_eq!(snapshot.total_value, Decimal::ZERO);
        assert!(snapshot.allocations.iter().all(|a| a.percent == 0.0));
        assert_eq!(snapshot.change_24h_pct, 0.0);
    }

    #[test]
    fn total_collapse_does_not_panic() {
        let assets = vec![Asset::new("LUNA", "Terra", dec!(0.0001), dec!(1000), -100.0)];
        let snapshot = compute_snapshot(&assets);

        assert_eq!(snapshot.change_24h_value, Decimal::ZERO);
    }

    #[test]
    fn best_performer_prefers_first_on_ties() {
        let assets = vec![
            Asset::new("A", "Alpha", dec!(1), dec!(1), 5.0),
            Asset::new("B", "Beta", dec!(1), dec!(1), 5.0),
        ];
        assert_eq!(best_performer(&assets).unwrap().symbol, "A");
        assert_eq!(worst_performer(&assets).unwrap().symbol, "A");
    }

    #[test]
    fn top_performers_are_ranked_and_truncated() {
        let assets = vec![
            Asset::new("A", "Alpha", dec!(1), dec!(1), 1.0),
            Asset::new("B", "Beta", dec!(1), dec!(1), 9.0),
            Asset::new("C", "Gamma", dec!(1), dec!(1), -3.0),
            Asset::new("D", "Delta", dec!(1), dec!(1), 9.0),
        ];

        let top: Vec<_> = top_performers(&assets, 3).into_iter().map(|p| p.symbol).collect();
        assert_eq!(top, vec!["B", "D", "A"]);

        let worst: Vec<_> = worst_performers(&assets, 1).into_iter().map(|p| p.symbol).collect();
        assert_eq!(worst, vec!["C"]);
    }

    #[test]
    fn category_allocation_sums_to_hundred() {
        let assets = vec![
            Asset::new("BTC", "Bitcoin", dec!(100), dec!(3), 0.0).with_category(AssetCategory::Layer1),
            Asset::new("USDC", "USD Coin", dec!(1), dec!(100), 0.0).with_category(AssetCategory::Stablecoin),
            Asset::new("PEPE", "Pepe", dec!(1), dec!(100), 0.0),
        ];
        let by_category = allocation_by_category(&assets);

        assert!((by_category.values().sum::<f64>() - 100.0).abs() < 1e-9);
        assert!((by_category[&AssetCategory::Layer1] - 60.0).abs() < 1e-9);
        assert!((by_category[&AssetCategory::Other] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn net_worth_subtracts_borrowing() {
        let snapshot = compute_snapshot(&btc_eth());
        let positions = vec![
            DefiPosition {
                protocol: "Aave".to_string(),
                kind: DefiPositionKind::Lending,
                asset: "USDC".to_string(),
                value: dec!(10000),
                apy: 4.0,
                rewards: dec!(50),
            },
            DefiPosition {
                protocol: "Aave".to_string(),
                kind: DefiPositionKind::Borrowing,
                asset: "ETH".to_string(),
                value: dec!(2500),
                apy: 2.5,
                rewards: Decimal::ZERO,
            },
        ];
        let nfts = vec![NftHolding {
            collection: "Pudgy Penguins".to_string(),
            token_id: "4021".to_string(),
            floor_price: dec!(30000),
            last_sale: None,
        }];

        let net = compute_net_worth(&snapshot, &positions, &nfts);
        assert_eq!(net.total, dec!(48000) + dec!(10000) + dec!(50) + dec!(30000) - dec!(2500));
        assert_eq!(net.defi_borrowed, dec!(2500));
    }

    #[test]
    fn weighted_apy_handles_empty_positions() {
        assert_eq!(weighted_apy(&[]), 0.0);
    }
}
