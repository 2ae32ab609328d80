use crate::model::Asset;
use crate::portfolio::finite_or_zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortKey {
    Symbol,
    Name,
    Price,
    Change24h,
    Quantity,
    Value,
    MarketCap,
    Volume24h,
}

impl SortKey {
    pub fn next(self) -> Self {
        match self {
            SortKey::Symbol => SortKey::Name,
            SortKey::Name => SortKey::Price,
            SortKey::Price => SortKey::Change24h,
            SortKey::Change24h => SortKey::Quantity,
            SortKey::Quantity => SortKey::Value,
            SortKey::Value => SortKey::MarketCap,
            SortKey::MarketCap => SortKey::Volume24h,
            SortKey::Volume24h => SortKey::Symbol,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Symbol => "Symbol",
            SortKey::Name => "Name",
            SortKey::Price => "Price",
            SortKey::Change24h => "24h",
            SortKey::Quantity => "Qty",
            SortKey::Value => "Value",
            SortKey::MarketCap => "MCap",
            SortKey::Volume24h => "Vol 24h",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// Orients an ascending comparison. Equal stays equal so a stable sort
    /// keeps ties in input order in both directions.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

fn compare(a: &Asset, b: &Asset, key: SortKey) -> Ordering {
    match key {
        SortKey::Symbol => a.symbol.to_lowercase().cmp(&b.symbol.to_lowercase()),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Price => a.price.cmp(&b.price),
        SortKey::Change24h => finite_or_zero(a.change_24h).total_cmp(&finite_or_zero(b.change_24h)),
        SortKey::Quantity => a.quantity.cmp(&b.quantity),
        SortKey::Value => a.value().cmp(&b.value()),
        SortKey::MarketCap => a
            .market_cap
            .unwrap_or(Decimal::ZERO)
            .cmp(&b.market_cap.unwrap_or(Decimal::ZERO)),
        SortKey::Volume24h => a
            .volume_24h
            .unwrap_or(Decimal::ZERO)
            .cmp(&b.volume_24h.unwrap_or(Decimal::ZERO)),
    }
}

/// Stable sort into a new vector; the input is left untouched.
pub fn sort_assets(assets: &[Asset], key: SortKey, direction: SortDirection) -> Vec<Asset> {
    let mut sorted = assets.to_vec();
    sorted.sort_by(|a, b| direction.apply(compare(a, b, key)));
    sorted
}
