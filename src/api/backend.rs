use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::api::provider::{DataSourceStatus, PortfolioSource};
use crate::config::BackendSettings;
use crate::model::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request failed: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Row is not a JSON object")]
    NotAnObject,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Http(e.to_string())
    }
}

/// Uniform envelope for every storage call. Exactly one of `data` and
/// `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    pub fn into_result(self) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(anyhow::anyhow!(
                "{}",
                self.error.unwrap_or_else(|| "backend returned no data".to_string())
            )),
        }
    }
}

impl<T> From<Result<T, BackendError>> for ApiResponse<T> {
    fn from(result: Result<T, BackendError>) -> Self {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::fail(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Assets,
    Transactions,
    DefiPositions,
    Nfts,
    Watchlist,
    PriceAlerts,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Assets,
        Table::Transactions,
        Table::DefiPositions,
        Table::Nfts,
        Table::Watchlist,
        Table::PriceAlerts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Assets => "assets",
            Table::Transactions => "transactions",
            Table::DefiPositions => "defi_positions",
            Table::Nfts => "nfts",
            Table::Watchlist => "watchlist",
            Table::PriceAlerts => "price_alerts",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Table::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row storage over a PostgREST-style HTTP API. Every row is scoped to the
/// configured user.
pub struct BackendClient {
    client: Client,
    base_url: Url,
    api_key: String,
    user_id: String,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let parsed = Url::parse(&settings.rest_url).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::InvalidUrl(settings.rest_url.clone()));
        }

        Ok(Self {
            client: Client::new(),
            base_url: parsed,
            api_key: settings.api_key.clone(),
            user_id: settings.user_id.clone(),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn request(&self, method: Method, table: Table, params: &[(&str, String)]) -> RequestBuilder {
        let url = table_url(&self.base_url, table, params);
        debug!("📡 {} {}", method, url);

        let mut builder = self.client.request(method, url).header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            builder = builder
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key));
        }
        builder
    }

    fn user_filter(&self) -> (&'static str, String) {
        ("user_id", format!("eq.{}", self.user_id))
    }

    fn row_filter(&self, id: &str) -> [(&'static str, String); 2] {
        [("id", format!("eq.{}", id)), self.user_filter()]
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, BackendError> {
        let response = builder.send().await.map_err(|e| {
            error!("❌ HTTP request failed: {}", e);
            BackendError::from(e)
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("❌ Request failed with status {}: {}", status, body);
            return Err(BackendError::Status { status, body });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            error!("❌ Failed to parse JSON response: {}", e);
            BackendError::Decode(e.to_string())
        })
    }

    pub async fn list<T: DeserializeOwned>(&self, table: Table) -> ApiResponse<Vec<T>> {
        let result = self
            .send(self.request(Method::GET, table, &[self.user_filter()]))
            .await
            .and_then(decode_rows);
        if let Ok(rows) = &result {
            debug!("✅ Loaded {} rows from {}", rows.len(), table);
        }
        result.into()
    }

    pub async fn insert<T: Serialize + DeserializeOwned>(&self, table: Table, row: &T) -> ApiResponse<T> {
        self.write_row(Method::POST, table, &[("select", "*".to_string())], row)
            .await
            .into()
    }

    pub async fn update<T: Serialize + DeserializeOwned>(&self, table: Table, id: &str, row: &T) -> ApiResponse<T> {
        self.write_row(Method::PATCH, table, &self.row_filter(id), row).await.into()
    }

    async fn write_row<T: Serialize + DeserializeOwned>(
        &self,
        method: Method,
        table: Table,
        params: &[(&str, String)],
        row: &T,
    ) -> Result<T, BackendError> {
        let body = scoped_row(row, &self.user_id)?;
        let value = self
            .send(
                self.request(method, table, params)
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;
        first_row(value)
    }

    pub async fn delete(&self, table: Table, id: &str) -> ApiResponse<()> {
        let result = self
            .send(self.request(Method::DELETE, table, &self.row_filter(id)))
            .await
            .map(|_| ());
        if result.is_ok() {
            info!("🗑️ Deleted {} row {}", table, id);
        }
        result.into()
    }

    /// Cheap reachability probe used for the status indicator.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let params = [self.user_filter(), ("limit", "1".to_string())];
        self.send(self.request(Method::GET, Table::Assets, &params))
            .await
            .map(|_| ())
    }
}

/// Appends the table to the base path and encodes every filter value, so
/// ids and user ids cannot alter the query.
fn table_url(base: &Url, table: Table, params: &[(&str, String)]) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(table.as_str());
    }
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    url
}

fn scoped_row<T: Serialize>(row: &T, user_id: &str) -> Result<Value, BackendError> {
    let mut value = serde_json::to_value(row).map_err(|e| BackendError::Decode(e.to_string()))?;
    let object = value.as_object_mut().ok_or(BackendError::NotAnObject)?;
    object.insert("user_id".to_string(), Value::String(user_id.to_string()));
    Ok(value)
}

fn decode_rows<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, BackendError> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => return Err(BackendError::Decode(format!("expected an array of rows, got {}", other))),
    };

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value(row) {
            Ok(item) => decoded.push(item),
            Err(e) => warn!("⚠️ Skipping malformed row: {}", e),
        }
    }
    Ok(decoded)
}

fn first_row<T: DeserializeOwned>(value: Value) -> Result<T, BackendError> {
    let row = match value {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        Value::Object(_) => value,
        other => return Err(BackendError::Decode(format!("expected a row, got {}", other))),
    };
    serde_json::from_value(row).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Live-mode data source reading every table through `BackendClient`.
pub struct BackendSource {
    client: BackendClient,
}

impl BackendSource {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        info!("🚀 Initializing backend source at {}", settings.rest_url);
        Ok(Self {
            client: BackendClient::new(settings)?,
        })
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }
}

#[async_trait]
impl PortfolioSource for BackendSource {
    async fn get_assets(&self) -> Result<Vec<Asset>> {
        self.client.list(Table::Assets).await.into_result()
    }

    async fn get_transactions(&self) -> Result<Vec<Transaction>> {
        self.client.list(Table::Transactions).await.into_result()
    }

    async fn get_defi_positions(&self) -> Result<Vec<DefiPosition>> {
        self.client.list(Table::DefiPositions).await.into_result()
    }

    async fn get_nfts(&self) -> Result<Vec<NftHolding>> {
        self.client.list(Table::Nfts).await.into_result()
    }

    async fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        self.client.list(Table::Watchlist).await.into_result()
    }

    async fn get_price_alerts(&self) -> Result<Vec<PriceAlert>> {
        self.client.list(Table::PriceAlerts).await.into_result()
    }

    async fn get_status(&self) -> DataSourceStatus {
        match self.client.ping().await {
            Ok(()) => DataSourceStatus::Connected,
            Err(BackendError::Http(e)) => {
                debug!("❌ Backend status: Disconnected - {}", e);
                DataSourceStatus::Disconnected
            }
            Err(e) => DataSourceStatus::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn rejects_non_http_urls() {
        let settings = BackendSettings {
            rest_url: "ftp://example.com".to_string(),
            ..BackendSettings::default()
        };
        assert!(matches!(BackendClient::new(&settings), Err(BackendError::InvalidUrl(_))));
    }

    #[test]
    fn table_urls_encode_filter_values() {
        let base = Url::parse("http://localhost:54321/rest/v1/").unwrap();
        let url = table_url(
            &base,
            Table::Watchlist,
            &[
                ("id", "eq.a&user_id=eq.other".to_string()),
                ("user_id", "eq.user 1,2".to_string()),
            ],
        );

        assert_eq!(url.path(), "/rest/v1/watchlist");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), "eq.a&user_id=eq.other".to_string()),
                ("user_id".to_string(), "eq.user 1,2".to_string()),
            ]
        );
        assert!(!url.as_str().contains("a&user_id"));
    }

    #[test]
    fn rows_are_scoped_to_the_user() {
        let asset = Asset::new("BTC", "Bitcoin", dec!(43000), dec!(1), 2.0);
        let row = scoped_row(&asset, "user-1").unwrap();
        assert_eq!(row["user_id"], json!("user-1"));
        assert_eq!(row["symbol"], json!("BTC"));
        assert_eq!(scoped_row(&"plain", "user-1"), Err(BackendError::NotAnObject));
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let rows = json!([
            {"symbol": "BTC", "name": "Bitcoin", "price": 43000.0, "change_24h": 2.0, "quantity": 1.0},
            {"symbol": "ETH"}
        ]);
        let assets: Vec<Asset> = decode_rows(rows).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].symbol, "BTC");
        assert!(decode_rows::<Asset>(json!({"oops": true})).is_err());
    }

    #[test]
    fn first_row_accepts_array_or_object() {
        let from_array: Value = first_row(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(from_array, json!({"a": 1}));
        let from_object: Value = first_row(json!({"a": 3})).unwrap();
        assert_eq!(from_object, json!({"a": 3}));
        assert!(first_row::<Value>(json!([])).is_err());
    }

    #[test]
    fn envelope_carries_either_data_or_error() {
        let ok: ApiResponse<u32> = Ok(3).into();
        assert!(ok.success);
        assert_eq!(ok.clone().into_result().unwrap(), 3);

        let failed: ApiResponse<u32> = Err(BackendError::Status {
            status: 404,
            body: "missing".to_string(),
        })
        .into();
        assert!(!failed.success);
        assert!(failed.data.is_none());
        assert_eq!(failed.error.as_deref(), Some("Request failed: 404 - missing"));
        assert!(failed.into_result().is_err());
    }

    #[test]
    fn table_names_round_trip() {
        for table in Table::ALL {
            assert_eq!(Table::from_name(table.as_str()), Some(table));
        }
        assert_eq!(Table::from_name("users"), None);
    }
}
