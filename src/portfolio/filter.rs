use crate::model::{Asset, AssetCategory};
use crate::portfolio::AggregationError;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HIGH_CHANGE_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum PerformanceBucket {
    #[default]
    All,
    Gainers,
    Losers,
    HighGainers,
    HighLosers,
}

impl PerformanceBucket {
    pub fn next(self) -> Self {
        match self {
            PerformanceBucket::All => PerformanceBucket::Gainers,
            PerformanceBucket::Gainers => PerformanceBucket::Losers,
            PerformanceBucket::Losers => PerformanceBucket::HighGainers,
            PerformanceBucket::HighGainers => PerformanceBucket::HighLosers,
            PerformanceBucket::HighLosers => PerformanceBucket::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceBucket::All => "All",
            PerformanceBucket::Gainers => "Gainers",
            PerformanceBucket::Losers => "Losers",
            PerformanceBucket::HighGainers => "Big gainers",
            PerformanceBucket::HighLosers => "Big losers",
        }
    }

    fn matches(self, change: f64, threshold: f64) -> bool {
        match self {
            PerformanceBucket::All => true,
            PerformanceBucket::Gainers => change > 0.0,
            PerformanceBucket::Losers => change < 0.0,
            PerformanceBucket::HighGainers => change >= threshold,
            PerformanceBucket::HighLosers => change <= -threshold,
        }
    }
}

/// User-chosen asset predicates. Every present criterion must hold; absent
/// or blank ones are ignored. Range bounds are kept as the raw text the user
/// typed and a bound that does not parse is treated as missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterCriteria {
    pub query: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub category: Option<AssetCategory>,
    pub performance: PerformanceBucket,
    pub high_change_threshold: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            query: None,
            min_price: None,
            max_price: None,
            min_value: None,
            max_value: None,
            category: None,
            performance: PerformanceBucket::All,
            high_change_threshold: DEFAULT_HIGH_CHANGE_THRESHOLD,
        }
    }
}

impl FilterCriteria {
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_price_range(mut self, min: &str, max: &str) -> Self {
        self.min_price = Some(min.to_string());
        self.max_price = Some(max.to_string());
        self
    }

    pub fn with_category(mut self, category: AssetCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_performance(mut self, bucket: PerformanceBucket) -> Self {
        self.performance = bucket;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.as_deref().map_or(true, |q| q.trim().is_empty())
            && bound(&self.min_price).is_none()
            && bound(&self.max_price).is_none()
            && bound(&self.min_value).is_none()
            && bound(&self.max_value).is_none()
            && self.category.is_none()
            && self.performance == PerformanceBucket::All
    }
}

pub fn parse_bound(raw: &str) -> Result<Option<Decimal>, AggregationError> {
    let trimmed = raw.trim().trim_start_matches('$').replace(',', "");
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<Decimal>()
        .map(Some)
        .map_err(|_| AggregationError::InvalidBound(raw.to_string()))
}

fn bound(raw: &Option<String>) -> Option<Decimal> {
    let raw = raw.as_deref()?;
    match parse_bound(raw) {
        Ok(value) => value,
        Err(e) => {
            debug!("🔎 Ignoring range bound: {}", e);
            None
        }
    }
}

fn in_range(x: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> bool {
    min.map_or(true, |min| x >= min) && max.map_or(true, |max| x <= max)
}

pub(crate) fn matches_query(asset: &Asset, needle: &str) -> bool {
    asset.symbol.to_lowercase().contains(needle) || asset.name.to_lowercase().contains(needle)
}

pub fn filter_assets(assets: &[Asset], criteria: &FilterCriteria) -> Vec<Asset> {
    let needle = criteria
        .query
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let (min_price, max_price) = (bound(&criteria.min_price), bound(&criteria.max_price));
    let (min_value, max_value) = (bound(&criteria.min_value), bound(&criteria.max_value));
    let threshold = if criteria.high_change_threshold.is_finite() {
        criteria.high_change_threshold.abs()
    } else {
        DEFAULT_HIGH_CHANGE_THRESHOLD
    };

    assets
        .iter()
        .filter(|asset| needle.as_deref().map_or(true, |n| matches_query(asset, n)))
        .filter(|asset| in_range(asset.price, min_price, max_price))
        .filter(|asset| in_range(asset.value(), min_value, max_value))
        .filter(|asset| criteria.category.map_or(true, |c| asset.category == Some(c)))
        .filter(|asset| criteria.performance.matches(asset.change_24h, threshold))
        .cloned()
        .collect()
}

/// Substring search over symbol and name. Matches are ranked exact symbol,
/// symbol prefix, name prefix, then any other substring; input order holds
/// within a rank. A blank query returns the input unchanged.
pub fn search_and_rank(assets: &[Asset], query: &str) -> Vec<Asset> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return assets.to_vec();
    }

    let mut ranked: Vec<(u8, &Asset)> = assets
        .iter()
        .filter_map(|asset| {
            let symbol = asset.symbol.to_lowercase();
            let name = asset.name.to_lowercase();
            let rank = if symbol == needle {
                0
            } else if symbol.starts_with(&needle) {
                1
            } else if name.starts_with(&needle) {
                2
            } else if symbol.contains(&needle) || name.contains(&needle) {
                3
            } else {
                return None;
            };
            Some((rank, asset))
        })
        .collect();

    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, asset)| asset.clone()).collect()
}
