use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unable to parse context file {path}: {message}")]
    ContextError { path: String, message: String },

    #[error("{program} exited with status {status:?}: {stderr}")]
    CommandFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {seconds}s")]
    CommandTimeout { program: String, seconds: u64 },

    #[error("{service} returned HTTP {status} for {url}")]
    UpstreamStatus {
        service: String,
        status: u16,
        url: String,
    },

    #[error("Job {job_type} not submitted successfully: {message}")]
    JobSubmissionError { job_type: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("S3 error: {message}")]
    S3Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Filesystem,
    ExternalTool,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IngestError {
    pub fn processing(message: impl Into<String>) -> Self {
        IngestError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::HttpError(_)
            | IngestError::UpstreamStatus { .. }
            | IngestError::JobSubmissionError { .. }
            | IngestError::S3Error { .. } => ErrorCategory::Network,
            IngestError::IoError(_) | IngestError::CsvError(_) => ErrorCategory::Filesystem,
            IngestError::ConfigValidationError { .. }
            | IngestError::InvalidConfigValueError { .. }
            | IngestError::MissingConfigError { .. }
            | IngestError::ContextError { .. } => ErrorCategory::Configuration,
            IngestError::CommandFailed { .. } | IngestError::CommandTimeout { .. } => {
                ErrorCategory::ExternalTool
            }
            IngestError::SerializationError(_) | IngestError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路類錯誤通常重試即可
            IngestError::HttpError(_)
            | IngestError::UpstreamStatus { .. }
            | IngestError::CommandTimeout { .. }
            | IngestError::S3Error { .. } => ErrorSeverity::Medium,
            IngestError::ConfigValidationError { .. }
            | IngestError::InvalidConfigValueError { .. }
            | IngestError::MissingConfigError { .. }
            | IngestError::ContextError { .. } => ErrorSeverity::Critical,
            IngestError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the settings file and _context.json in the work directory"
            }
            ErrorCategory::Network => {
                "Check that GRQ, Mozart, CMR and the AVA are reachable, then rerun the job"
            }
            ErrorCategory::Filesystem => "Check permissions and free space in the work directory",
            ErrorCategory::ExternalTool => {
                "Make sure wget and ImageMagick convert are installed and the source URL is valid"
            }
            ErrorCategory::Data => "Inspect the upstream metadata record for missing fields",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            IngestError::ContextError { path, .. } => {
                format!("unable to parse {} from work directory", path)
            }
            IngestError::MissingConfigError { field } => {
                format!("{} must be specified", field)
            }
            IngestError::CommandFailed { program, .. } => {
                format!("{} failed while localizing product files", program)
            }
            other => other.to_string(),
        }
    }

    /// Process exit code for a failed run.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
