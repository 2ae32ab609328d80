use crate::model::wallet::ProviderId;
use thiserror::Error;

/// Every provider failure maps onto one of these; none are fatal and the
/// coordinator is back in `Disconnected` after reporting one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("Connection request rejected: {0}")]
    UserRejected(String),

    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Unsupported chain: {chain_id}")]
    UnsupportedChain { chain_id: u64 },

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Wallet did not respond within {0}ms")]
    Timeout(u64),

    #[error("Connection attempt cancelled by disconnect")]
    Cancelled,

    #[error("Unknown wallet error: {0}")]
    Unknown(String),
}

impl ConnectionError {
    pub fn code(&self) -> &'static str {
        match self {
            ConnectionError::UserRejected(_) => "USER_REJECTED",
            ConnectionError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            ConnectionError::UnsupportedChain { .. } => "UNSUPPORTED_CHAIN",
            ConnectionError::NetworkFailure(_) => "NETWORK_FAILURE",
            ConnectionError::Timeout(_) => "TIMEOUT",
            ConnectionError::Cancelled => "CANCELLED",
            ConnectionError::Unknown(_) => "UNKNOWN",
        }
    }

    /// Maps EIP-1193 provider error codes plus the JSON-RPC "request already
    /// pending" code.
    pub fn from_rpc_code(code: i64, message: &str) -> Self {
        match code {
            4001 | 4100 => ConnectionError::UserRejected(message.to_string()),
            4200 | 4900 | 4901 => ConnectionError::ProviderUnavailable(message.to_string()),
            4902 => ConnectionError::UnsupportedChain { chain_id: 0 },
            -32002 => ConnectionError::Unknown(format!("request already pending: {}", message)),
            -32603 | -32000 => ConnectionError::NetworkFailure(message.to_string()),
            _ => ConnectionError::Unknown(format!("{} (code {})", message, code)),
        }
    }
}

impl From<reqwest::Error> for ConnectionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            ConnectionError::ProviderUnavailable(e.to_string())
        } else if e.is_timeout() {
            ConnectionError::NetworkFailure(format!("request timed out: {}", e))
        } else {
            ConnectionError::NetworkFailure(e.to_string())
        }
    }
}

/// Local state is already cleared when this is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DisconnectionError {
    #[error("{provider} did not acknowledge disconnect: {source}")]
    Remote {
        provider: ProviderId,
        #[source]
        source: ConnectionError,
    },
}
