use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Health probe failed: {0}")]
    ProbeError(#[from] reqwest::Error),

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

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown environment '{name}' (expected development, production or testing)")]
    UnknownEnvironment { name: String },

    #[error("Invalid trigger expression '{expression}': {reason}")]
    InvalidTrigger { expression: String, reason: String },

    #[error("Unknown job: {name}")]
    UnknownJob { name: String },

    #[error("Job '{job}' failed: {details}")]
    JobFailed { job: String, details: String },

    #[error("Unexpected health response from {url}: {details}")]
    UnhealthyResponse { url: String, details: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Scheduling,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::ConfigError { .. }
            | ApiError::ConfigValidationError { .. }
            | ApiError::InvalidConfigValueError { .. }
            | ApiError::MissingConfigError { .. }
            | ApiError::UnknownEnvironment { .. } => ErrorCategory::Configuration,
            ApiError::ProbeError(_) | ApiError::UnhealthyResponse { .. } => ErrorCategory::Network,
            ApiError::InvalidTrigger { .. }
            | ApiError::UnknownJob { .. }
            | ApiError::JobFailed { .. } => ErrorCategory::Scheduling,
            ApiError::IoError(_) | ApiError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 啟動時的設定錯誤一律視為致命
            ErrorCategory::Configuration => ErrorSeverity::Critical,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Scheduling => match self {
                ApiError::JobFailed { .. } => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            ErrorCategory::System => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ApiError::UnknownEnvironment { .. } => {
                "Set FINANCE_API_ENV to one of: development, production, testing".to_string()
            }
            ApiError::ConfigError { .. } | ApiError::ConfigValidationError { .. } => {
                "Check the base configuration file for syntax errors".to_string()
            }
            ApiError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration", field)
            }
            ApiError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            ApiError::InvalidTrigger { .. } => {
                "Use a cron expression such as '0 0 * * *' or '0 */6 * * *'".to_string()
            }
            ApiError::UnknownJob { .. } => {
                "Run `finance-api jobs list` to see the declared jobs".to_string()
            }
            ApiError::JobFailed { .. } => "Inspect the job logs and retry the run".to_string(),
            ApiError::ProbeError(_) | ApiError::UnhealthyResponse { .. } => {
                "Make sure the service is running and the URL points at its health path"
                    .to_string()
            }
            ApiError::IoError(_) => "Check file permissions and available disk space".to_string(),
            ApiError::SerializationError(_) => "Report this as a bug".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Service unreachable: {}", self),
            ErrorCategory::Scheduling => format!("Job scheduling problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
