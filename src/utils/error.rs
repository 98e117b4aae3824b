use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnowError {
    #[error("API request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Unexpected response - {status} {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Profile parsing error: {0}")]
    ProfileError(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    ArgumentError { message: String },

    #[error("Missing required parameters {}", .0.join(", "))]
    MissingParameters(Vec<String>),

    #[error("{message}")]
    QueryError { message: String },

    #[error("No {table} records match the {query} query.")]
    NoMatch { table: String, query: String },

    #[error("{count} {table} records match the {query} query.")]
    MultipleMatches {
        count: usize,
        table: String,
        query: String,
    },

    #[error("{message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Remote,
    Configuration,
    Input,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SnowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SnowError::HttpError(_) => ErrorCategory::Network,
            SnowError::AuthError { .. } => ErrorCategory::Authentication,
            SnowError::UnexpectedResponse { .. }
            | SnowError::NoMatch { .. }
            | SnowError::MultipleMatches { .. } => ErrorCategory::Remote,
            SnowError::ProfileError(_)
            | SnowError::UrlError(_)
            | SnowError::ConfigError { .. }
            | SnowError::MissingConfigError { .. }
            | SnowError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            SnowError::ArgumentError { .. }
            | SnowError::MissingParameters(_)
            | SnowError::QueryError { .. } => ErrorCategory::Input,
            SnowError::SerializationError(_) | SnowError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            SnowError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Remote | ErrorCategory::Input | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::Authentication | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check that the instance host is reachable and retry",
            ErrorCategory::Authentication => {
                "Verify the instance credentials and OAuth client settings"
            }
            ErrorCategory::Remote => "Check the record identifiers and query against the instance",
            ErrorCategory::Configuration => {
                "Review the instance settings, profile file and SN_* environment variables"
            }
            ErrorCategory::Input => "Fix the module parameters and run again",
            ErrorCategory::Data => "Inspect the response returned by the instance",
            ErrorCategory::System => "Check file paths and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SnowError::HttpError(e) if e.is_timeout() => {
                "The ServiceNow instance did not answer in time".to_string()
            }
            SnowError::HttpError(e) if e.is_connect() => {
                "Could not connect to the ServiceNow instance".to_string()
            }
            SnowError::AuthError { .. } => "ServiceNow rejected the credentials".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SnowError>;
