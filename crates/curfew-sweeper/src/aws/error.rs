//! Provider error classification
//!
//! Classifies AWS SDK failures by error code into the categories the sweeper
//! cares about. Codes are extracted from the error's Debug representation,
//! which carries the service error code for every SDK operation; this keeps
//! the classifier independent of the per-operation error types of nine
//! different service crates.

use thiserror::Error;

/// Provider error categories
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource no longer exists; for deactivation this means the work is
    /// already done
    #[error("resource not found")]
    NotFound,

    /// Resource is not in a state that accepts the action (e.g. stopping an
    /// instance that is already stopping)
    #[error("resource in wrong state: {message}")]
    InvalidState { message: String },

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    Throttled,

    /// Credentials lack permission for the call
    #[error("access denied: {message}")]
    AccessDenied { message: String },

    /// Any other SDK error
    #[error("provider call failed: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound)
    }

    /// Not-found and invalid-state mean the action is moot rather than
    /// broken: the resource is already gone or already transitioning.
    pub fn is_already_settled(&self) -> bool {
        matches!(
            self,
            ProviderError::NotFound | ProviderError::InvalidState { .. }
        )
    }
}

/// Error codes meaning the resource does not exist
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidInstanceID.NotFound",
    "NatGatewayNotFound",
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "LoadBalancerNotFound",
    "NoSuchBucket",
    "ResourceNotFoundException",
    "ResourceNotFoundFault",
];

/// Error codes meaning the resource cannot take the action right now
const INVALID_STATE_CODES: &[&str] = &[
    "IncorrectState",
    "IncorrectInstanceState",
    "InvalidDBInstanceState",
    "InvalidDBInstanceStateFault",
    "ResourceInUseException",
    "OperationNotPermittedException",
    "ValidationError",
];

/// Error codes for rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Error codes for missing permissions
const ACCESS_DENIED_CODES: &[&str] = &[
    "UnauthorizedOperation",
    "AccessDenied",
    "AccessDeniedException",
];

/// Classify a raw error code + message into a `ProviderError`.
pub fn classify_provider_error(code: Option<&str>, message: &str) -> ProviderError {
    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ProviderError::NotFound,
        Some(c) if INVALID_STATE_CODES.contains(&c) => ProviderError::InvalidState {
            message: message.to_string(),
        },
        Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled,
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => ProviderError::AccessDenied {
            message: message.to_string(),
        },
        _ => ProviderError::Sdk {
            code: code.map(|s| s.to_string()),
            message: message.to_string(),
        },
    }
}

/// Classify an `anyhow::Error` from an SDK call by scanning its Debug
/// representation for a known error code.
pub fn classify_sdk_error(error: &anyhow::Error) -> ProviderError {
    let debug_str = format!("{:?}", error);
    let code = extract_error_code(&debug_str);
    classify_provider_error(code.as_deref(), &error.to_string())
}

/// Short, single-line description for the run summary.
pub fn provider_error_message(error: &anyhow::Error) -> String {
    match classify_sdk_error(error) {
        ProviderError::Sdk { code: None, .. } => error.to_string(),
        classified => classified.to_string(),
    }
}

fn extract_error_code(debug_str: &str) -> Option<String> {
    for codes in [
        NOT_FOUND_CODES,
        INVALID_STATE_CODES,
        THROTTLING_CODES,
        ACCESS_DENIED_CODES,
    ] {
        for code in codes {
            if debug_str.contains(code) {
                return Some((*code).to_string());
            }
        }
    }

    // Generic `code: Some("...")` pattern from SDK error metadata
    if let Some(start) = debug_str.find("code: Some(\"") {
        let rest = &debug_str[start + 12..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    None
}
