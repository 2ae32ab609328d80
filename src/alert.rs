use crate::config::AlertThresholds;
use crate::model::{Alert, AlertCondition, AlertLevel, Asset, PortfolioSnapshot, PriceAlert};
use chrono::Utc;
use rust_decimal::prelude::*;
use uuid::Uuid;

pub fn check_alerts(
    snapshot: &PortfolioSnapshot,
    assets: &[Asset],
    price_alerts: &[PriceAlert],
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for price_alert in price_alerts.iter().filter(|a| a.active) {
        let Some(asset) = assets.iter().find(|a| a.symbol.eq_ignore_ascii_case(&price_alert.symbol)) else {
            continue;
        };
        let price = asset.price.to_f64().unwrap_or(0.0);

        match price_alert.condition {
            AlertCondition::Above(target) if asset.price >= target => {
                alerts.push(create_alert(
                    AlertLevel::Info,
                    format!("{} Price", asset.symbol),
                    format!("{} is above ${}: now ${}", asset.symbol, target, asset.price),
                    price,
                    target.to_f64().unwrap_or(0.0),
                ));
            }
            AlertCondition::Below(target) if asset.price <= target => {
                alerts.push(create_alert(
                    AlertLevel::Info,
                    format!("{} Price", asset.symbol),
                    format!("{} is below ${}: now ${}", asset.symbol, target, asset.price),
                    price,
                    target.to_f64().unwrap_or(0.0),
                ));
            }
            AlertCondition::PercentMove(target) if asset.change_24h.abs() >= target => {
                alerts.push(create_alert(
                    AlertLevel::Warning,
                    format!("{} Move", asset.symbol),
                    format!("{} moved {:+.2}% in 24h", asset.symbol, asset.change_24h),
                    asset.change_24h,
                    target,
                ));
            }
            _ => {}
        }
    }

    let largest = snapshot
        .allocations
        .iter()
        .max_by(|a, b| a.percent.total_cmp(&b.percent));

    if let Some(allocation) = largest {
        if allocation.percent > thresholds.concentration_critical {
            alerts.push(create_alert(
                AlertLevel::Critical,
                "Concentration".to_string(),
                format!("{} is {:.1}% of the portfolio", allocation.symbol, allocation.percent),
                allocation.percent,
                thresholds.concentration_critical,
            ));
        } else if allocation.percent > thresholds.concentration_warning {
            alerts.push(create_alert(
                AlertLevel::Warning,
                "Concentration".to_string(),
                format!("High concentration in {}: {:.1}%", allocation.symbol, allocation.percent),
                allocation.percent,
                thresholds.concentration_warning,
            ));
        }
    }

    let daily_move = snapshot.change_24h_pct.abs();
    if daily_move >= thresholds.daily_move_critical {
        alerts.push(create_alert(
            AlertLevel::Critical,
            "Portfolio 24h".to_string(),
            format!("Portfolio moved {:+.2}% in 24h", snapshot.change_24h_pct),
            snapshot.change_24h_pct,
            thresholds.daily_move_critical,
        ));
    } else if daily_move >= thresholds.daily_move_warning {
        alerts.push(create_alert(
            AlertLevel::Warning,
            "Portfolio 24h".to_string(),
            format!("Large portfolio move: {:+.2}% in 24h", snapshot.change_24h_pct),
            snapshot.change_24h_pct,
            thresholds.daily_move_warning,
        ));
    }

    alerts
}

fn create_alert(
    level: AlertLevel,
    metric: String,
    message: String,
    value: f64,
    threshold: f64,
) -> Alert {
    Alert {
        id: Uuid::new_v4().to_string(),
        level,
        metric,
        message,
        timestamp: Utc::now(),
        value,
        threshold,
    }
}
