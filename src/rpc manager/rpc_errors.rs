use solana_client::client_error::{reqwest::StatusCode, ClientError, ClientErrorKind};
use solana_rpc_client_api::request::RpcError;
use std::time::Duration;
use thiserror::Error;

/// RPC failure taxonomy shared by the submitter, poller and program client
#[derive(Debug, Clone, Error)]
pub enum RpcManagerError {
    /// Connection refused, reset or dropped
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// HTTP status other than 429 from the RPC node
    #[error("HTTP status {status} (endpoint: {endpoint})")]
    HttpStatus { endpoint: String, status: u16 },

    /// JSON-RPC error object returned by the node
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Server answered HTTP 429
    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded { endpoint: String },

    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    #[error("Transaction expired (endpoint: {endpoint})")]
    TransactionExpired { endpoint: String },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    /// Response could not be interpreted
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Anything the retry loops must give up on
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl RpcManagerError {
    /// Transient failures worth another attempt on the same request
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. }
            | Self::Timeout { .. }
            | Self::RateLimitExceeded { .. }
            | Self::BlockhashNotFound { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            // -32000..-32099 is the node-side range (node behind, slot skipped)
            Self::RpcResponse { code, .. } => code.is_some_and(|c| (-32099..=-32000).contains(&c)),
            Self::TransactionExpired { .. }
            | Self::InsufficientFunds { .. }
            | Self::MalformedResponse(_)
            | Self::Fatal(_) => false,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RpcManagerError::RateLimitExceeded { .. })
    }

    /// Numeric code shown in diagnostics ("Rpc error: <code>")
    pub fn server_code(&self) -> Option<i64> {
        match self {
            RpcManagerError::RateLimitExceeded { .. } => Some(429),
            RpcManagerError::HttpStatus { status, .. } => Some(*status as i64),
            RpcManagerError::RpcResponse { code, .. } => *code,
            _ => None,
        }
    }

    /// Node URL the failure came from, when known
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::HttpStatus { endpoint, .. }
            | Self::RpcResponse { endpoint, .. }
            | Self::RateLimitExceeded { endpoint }
            | Self::BlockhashNotFound { endpoint }
            | Self::TransactionExpired { endpoint }
            | Self::InsufficientFunds { endpoint } => Some(endpoint),
            Self::MalformedResponse(_) | Self::Fatal(_) => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            RpcManagerError::Transport { .. } => "transport",
            RpcManagerError::Timeout { .. } => "timeout",
            RpcManagerError::HttpStatus { .. } => "http",
            RpcManagerError::RpcResponse { .. } => "rpc",
            RpcManagerError::RateLimitExceeded { .. } => "rate_limit",
            RpcManagerError::BlockhashNotFound { .. } => "blockhash",
            RpcManagerError::TransactionExpired { .. } => "expired",
            RpcManagerError::InsufficientFunds { .. } => "funds",
            RpcManagerError::MalformedResponse(_) => "malformed",
            RpcManagerError::Fatal(_) => "fatal",
        }
    }

    /// Classify a `ClientError` from the nonblocking client
    ///
    /// HTTP status is taken from the transport error when present; the
    /// remaining cases are classified from the error text. `timeout` is the
    /// client's request timeout, reported back on `Timeout`.
    pub fn from_client_error(err: &ClientError, endpoint: &str, timeout: Duration) -> Self {
        let endpoint = endpoint.to_string();
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

        match err.kind() {
            ClientErrorKind::Reqwest(reqwest_err) => {
                if let Some(status) = reqwest_err.status() {
                    return Self::from_status(status, endpoint);
                }
                if reqwest_err.is_timeout() {
                    return RpcManagerError::Timeout {
                        endpoint,
                        timeout_ms,
                    };
                }
                return RpcManagerError::Transport {
                    endpoint,
                    message: reqwest_err.to_string(),
                };
            }
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                return Self::classify_message(message, Some(*code), endpoint, timeout_ms);
            }
            ClientErrorKind::Io(io_err) => {
                return RpcManagerError::Transport {
                    endpoint,
                    message: io_err.to_string(),
                };
            }
            ClientErrorKind::SerdeJson(json_err) => {
                return RpcManagerError::MalformedResponse(json_err.to_string());
            }
            _ => {}
        }

        Self::classify_message(&err.to_string(), None, endpoint, timeout_ms)
    }

    fn from_status(status: StatusCode, endpoint: String) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            RpcManagerError::RateLimitExceeded { endpoint }
        } else {
            RpcManagerError::HttpStatus {
                endpoint,
                status: status.as_u16(),
            }
        }
    }

    fn classify_message(
        message: &str,
        code: Option<i64>,
        endpoint: String,
        timeout_ms: u64,
    ) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("blockhash not found") {
            RpcManagerError::BlockhashNotFound { endpoint }
        } else if lower.contains("transaction expired") || lower.contains("block height exceeded")
        {
            RpcManagerError::TransactionExpired { endpoint }
        } else if lower.contains("insufficient funds") || lower.contains("insufficient lamports") {
            RpcManagerError::InsufficientFunds { endpoint }
        } else if lower.contains("rate limit") || lower.contains("too many requests") {
            RpcManagerError::RateLimitExceeded { endpoint }
        } else if lower.contains("timeout") || lower.contains("timed out") {
            RpcManagerError::Timeout {
                endpoint,
                timeout_ms,
            }
        } else {
            RpcManagerError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}
