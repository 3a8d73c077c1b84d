use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Network error calling {service}: {message}")]
    NetworkError { service: String, message: String },

    #[error("{service} responded with status {status}")]
    RemoteStatusError { service: String, status: u16 },

    #[error("Failed to decode response from {service}: {message}")]
    DecodeError { service: String, message: String },

    #[error("Call to {service} timed out after {timeout_ms}ms")]
    TimeoutError { service: String, timeout_ms: u64 },

    #[error("No endpoints available for {service}")]
    NoEndpointsAvailable { service: String },

    #[error("Circuit open for {service}, call not attempted")]
    CircuitOpen { service: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Downstream,
    Configuration,
    System,
}

impl GatewayError {
    /// 將 reqwest 錯誤分類為逾時、解碼或網路錯誤
    pub fn from_reqwest(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest 不回報實際的逾時值，交給呼叫端的 budget 判斷
            GatewayError::TimeoutError {
                service: service.to_string(),
                timeout_ms: 0,
            }
        } else if err.is_decode() {
            GatewayError::DecodeError {
                service: service.to_string(),
                message: err.to_string(),
            }
        } else {
            GatewayError::NetworkError {
                service: service.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        GatewayError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::InvalidRequest { .. } => ErrorCategory::Request,
            GatewayError::NetworkError { .. }
            | GatewayError::RemoteStatusError { .. }
            | GatewayError::DecodeError { .. }
            | GatewayError::TimeoutError { .. }
            | GatewayError::NoEndpointsAvailable { .. }
            | GatewayError::CircuitOpen { .. } => ErrorCategory::Downstream,
            GatewayError::ConfigError { .. }
            | GatewayError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            GatewayError::IoError(_) => ErrorCategory::System,
        }
    }

    /// 短名稱，用於降級日誌與指標
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::InvalidRequest { .. } => "invalid_request",
            GatewayError::NetworkError { .. } => "network",
            GatewayError::RemoteStatusError { .. } => "remote_status",
            GatewayError::DecodeError { .. } => "decode",
            GatewayError::TimeoutError { .. } => "timeout",
            GatewayError::NoEndpointsAvailable { .. } => "no_endpoints",
            GatewayError::CircuitOpen { .. } => "circuit_open",
            GatewayError::IoError(_) => "io",
            GatewayError::ConfigError { .. } | GatewayError::InvalidConfigValueError { .. } => {
                "config"
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Request => "Check that the user id in the request path is not empty",
            ErrorCategory::Downstream => {
                "Check that the downstream service is registered and reachable"
            }
            ErrorCategory::Configuration => {
                "Check the configuration file and command line overrides"
            }
            ErrorCategory::System => "Check file permissions and available resources",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
