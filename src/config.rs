use anyhow::Result;
use figment::{Figment, providers::{Format, Toml, Env, Serialized}};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::model::wallet::ProviderId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub operating_mode: OperatingMode,
    pub backend: BackendSettings,
    pub wallet: WalletSettings,
    pub portfolio: PortfolioSettings,
    pub alert_thresholds: AlertThresholds,
    pub ui_settings: UiSettings,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OperatingMode {
    Live,
    Demo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    pub rest_url: String,
    pub realtime_url: Option<String>,
    pub api_key: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    pub connect_timeout_ms: u64,
    pub supported_chains: Vec<u64>,
    pub default_provider: String,
    pub providers: BTreeMap<String, ProviderEndpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    pub bridge_url: String,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub events_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSettings {
    pub refresh_interval_ms: u64,
    pub high_change_threshold: f64,
    pub top_performers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub concentration_warning: f64,
    pub concentration_critical: f64,
    pub daily_move_warning: f64,
    pub daily_move_critical: f64,
    pub max_alerts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    pub refresh_rate_ms: u64,
    pub show_debug_info: bool,
    pub auto_scroll_alerts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            operating_mode: OperatingMode::Demo,
            backend: BackendSettings::default(),
            wallet: WalletSettings::default(),
            portfolio: PortfolioSettings::default(),
            alert_thresholds: AlertThresholds::default(),
            ui_settings: UiSettings::default(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            rest_url: "http://localhost:54321/rest/v1".to_string(),
            realtime_url: Some("ws://localhost:54321/realtime/v1/websocket".to_string()),
            api_key: String::new(),
            user_id: String::new(),
        }
    }
}

impl Default for WalletSettings {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            ProviderId::MetaMask.to_string(),
            ProviderEndpoint {
                bridge_url: "http://127.0.0.1:8545".to_string(),
                rpc_url: None,
                events_url: Some("ws://127.0.0.1:8546".to_string()),
            },
        );
        providers.insert(
            ProviderId::Phantom.to_string(),
            ProviderEndpoint {
                bridge_url: "http://127.0.0.1:8899".to_string(),
                rpc_url: Some("https://api.mainnet-beta.solana.com".to_string()),
                events_url: None,
            },
        );

        Self {
            connect_timeout_ms: 30_000,
            supported_chains: vec![1, 10, 56, 101, 137, 8453, 42161],
            default_provider: ProviderId::MetaMask.to_string(),
            providers,
        }
    }
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5000,
            high_change_threshold: 10.0,
            top_performers: 5,
        }
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            concentration_warning: 40.0,
            concentration_critical: 60.0,
            daily_move_warning: 5.0,
            daily_move_critical: 10.0,
            max_alerts: 200,
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 100,
            show_debug_info: false,
            auto_scroll_alerts: true,
        }
    }
}

pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_file = config_path.unwrap_or("config.toml");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed("FOLIO_").split("__"))
        .extract()?;

    validate_config(&config)?;

    Ok(config)
}

pub fn generate_sample_config() -> Result<()> {
    let config = Config::default();
    let toml_content = toml::to_string_pretty(&config)?;

    fs::write("config.toml", toml_content)?;

    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.operating_mode == OperatingMode::Live {
        if config.backend.user_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Please set backend.user_id for live mode"));
        }
        url::Url::parse(&config.backend.rest_url)
            .map_err(|e| anyhow::anyhow!("backend.rest_url is not a valid URL: {}", e))?;
    }

    if config.wallet.connect_timeout_ms < 1000 {
        return Err(anyhow::anyhow!("wallet.connect_timeout_ms must be at least 1000ms"));
    }

    if config.wallet.default_provider.parse::<ProviderId>().is_err() {
        return Err(anyhow::anyhow!(
            "wallet.default_provider '{}' is not a known provider",
            config.wallet.default_provider
        ));
    }

    if config.portfolio.refresh_interval_ms < 500 {
        return Err(anyhow::anyhow!("portfolio.refresh_interval_ms must be at least 500ms"));
    }

    if config.ui_settings.refresh_rate_ms < 50 {
        return Err(anyhow::anyhow!("UI refresh_rate_ms must be at least 50ms"));
    }

    if config.alert_thresholds.concentration_warning > config.alert_thresholds.concentration_critical {
        return Err(anyhow::anyhow!("concentration_warning must not exceed concentration_critical"));
    }

    Ok(())
}

pub fn save_config_to_file(config: &Config, path: &str) -> Result<()> {
    let toml_content = toml::to_string_pretty(config)?;
    std::fs::write(path, toml_content)?;
    Ok(())
}
