use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookeyError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("API returned HTTP {status} for {endpoint}: {message}")]
    ApiStatusError {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Empty response body from {endpoint}")]
    EmptyBodyError { endpoint: String },

    #[error("Not authenticated: {message}")]
    UnauthorizedError { message: String },

    #[error("Session expired, user has been logged out")]
    SessionExpired,

    #[error("No camera frame available")]
    NoFrameError,

    #[error("Current location unavailable")]
    NoLocationError,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Api,
    Device,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LookeyError {
    pub fn api_status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiStatusError {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) => ErrorCategory::Network,
            Self::UnauthorizedError { .. } | Self::SessionExpired => ErrorCategory::Authentication,
            Self::ApiStatusError { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            Self::ApiStatusError { .. } | Self::EmptyBodyError { .. } => ErrorCategory::Api,
            Self::NoFrameError | Self::NoLocationError | Self::IoError(_) => ErrorCategory::Device,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UrlError(_) => ErrorCategory::Configuration,
            Self::SerializationError(_) | Self::CsvError(_) | Self::ValidationError { .. } => {
                ErrorCategory::Data
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Api if self.is_server_error() => ErrorSeverity::Medium,
            ErrorCategory::Api | ErrorCategory::Data | ErrorCategory::Device => ErrorSeverity::High,
            ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// True for HTTP 5xx answers; their bodies are usually HTML error pages.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiStatusError { status, .. } if *status >= 500)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the network connection and the API base URL, then try again",
            ErrorCategory::Authentication => "Log in again with `lookey login <google-id-token>`",
            ErrorCategory::Api if self.is_server_error() => "The server is unstable, retry in a moment",
            ErrorCategory::Api => "Check the request parameters against the API contract",
            ErrorCategory::Device => "Make sure the frame images or location values are available",
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::Data => "The server response did not match the expected format",
        }
    }

    /// Message suitable for speech output or a banner.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) => "네트워크 연결을 확인해주세요.".to_string(),
            Self::SessionExpired => "세션이 만료되었습니다. 다시 로그인해주세요.".to_string(),
            Self::UnauthorizedError { message } => message.clone(),
            Self::ApiStatusError { status, .. } if *status >= 500 => {
                "서버가 잠시 불안정해요. 잠시 후 다시 시도해주세요.".to_string()
            }
            Self::NoFrameError => "카메라 프레임을 가져올 수 없습니다.".to_string(),
            Self::NoLocationError => "현재 위치를 가져올 수 없습니다.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LookeyError>;
