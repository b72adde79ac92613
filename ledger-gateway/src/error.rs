use thiserror::Error;

/// Backend code for "no information available", used by bitcoind/btcd for
/// missing spent info, unknown mempool entries and absent address index data.
pub const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;

/// Connection level failure talking to an endpoint (no JSON-RPC reply at all).
pub const RPC_TRANSPORT_ERROR: i32 = -32001;

/// The endpoint did not answer within its per-attempt timeout.
pub const RPC_TIMEOUT_ERROR: i32 = -32002;

/// The endpoint answered with something we could not decode.
pub const RPC_INVALID_RESPONSE: i32 = -32003;

/// An error reported by (or while talking to) a single backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend error {code}: {message}")]
pub struct BackendError {
    pub code: i32,
    pub message: String,
}

impl BackendError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RPC_TRANSPORT_ERROR, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RPC_TIMEOUT_ERROR, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == RPC_INVALID_ADDRESS_OR_KEY
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Every endpoint failed; carries the last endpoint's code and message.
    #[error("RPC error {code}: {message}")]
    Backend { code: i32, message: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid height range: {0}")]
    Range(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("Rejecting request: {}", message);
        Self::Validation(message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("Rejecting height range: {}", message);
        Self::Range(message)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Backend { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<BackendError> for GatewayError {
    fn from(e: BackendError) -> Self {
        Self::Backend {
            code: e.code,
            message: e.message,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_normalization() {
        let e = BackendError::new(-8, "Block height out of range");
        let e: GatewayError = e.into();
        assert_eq!(e.code(), Some(-8));
        assert_eq!(e.to_string(), "RPC error -8: Block height out of range");

        assert!(BackendError::new(-5, "No information available").is_not_found());
        assert!(!BackendError::transport("connection refused").is_not_found());
        assert_eq!(GatewayError::validation("bad").code(), None);
    }
}
