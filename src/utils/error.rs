use thiserror::Error;

/// Failure while querying the search API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Search API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Search API returned a malformed body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid search endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// A single listing record could not be turned into a `Listing`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListingFieldError {
    #[error("listing record is not a JSON object")]
    NotAnObject,

    #[error("listing has no `{field}` field")]
    Missing { field: &'static str },

    #[error("listing field `{field}` has an unexpected type")]
    WrongType { field: &'static str },

    #[error("listing id {id:?} contains a line break")]
    InvalidId { id: String },
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Invalid mail address `{address}`: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build mail message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Mail server rejected the message: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read ledger {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write ledger {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Configuration error in `{field}`: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for `{field}` ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Delivery,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DigestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DigestError::ConfigValidationError { .. }
            | DigestError::MissingConfigError { .. }
            | DigestError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DigestError::Fetch(FetchError::Decode(_)) => ErrorCategory::Data,
            DigestError::Fetch(_) => ErrorCategory::Network,
            DigestError::Delivery(_) => ErrorCategory::Delivery,
            DigestError::IoError(_) | DigestError::Ledger(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DigestError::ConfigValidationError { .. }
            | DigestError::MissingConfigError { .. }
            | DigestError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            DigestError::Fetch(FetchError::Endpoint(_)) => ErrorSeverity::High,
            DigestError::Fetch(_) | DigestError::Ledger(LedgerError::Read { .. }) => {
                ErrorSeverity::Medium
            }
            // The next scheduled run re-sends whatever was not committed.
            DigestError::Delivery(_) | DigestError::Ledger(LedgerError::Write { .. }) => {
                ErrorSeverity::Low
            }
            DigestError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DigestError::MissingConfigError { .. } => {
                "Set the missing value in the config file or the environment (.env is loaded automatically)"
            }
            DigestError::ConfigValidationError { .. }
            | DigestError::InvalidConfigValueError { .. } => {
                "Fix the reported configuration value and run again"
            }
            DigestError::Fetch(FetchError::Transport(_)) => {
                "Check network connectivity and the API credentials; the next run will retry"
            }
            DigestError::Fetch(FetchError::Decode(_)) => {
                "The search API answered with an unexpected payload; the next run will retry"
            }
            DigestError::Fetch(FetchError::Endpoint(_)) => "Check `search.endpoint` and `search.country`",
            DigestError::Delivery(_) => {
                "Check the SMTP host and credentials; undelivered listings are retried next run"
            }
            DigestError::Ledger(_) => "Check permissions on the ledger file and its directory",
            DigestError::IoError(_) => "Check file system permissions and free disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Network => format!("Could not reach the job search API: {}", self),
            ErrorCategory::Data => format!("Job search API returned unreadable data: {}", self),
            ErrorCategory::Delivery => format!("Digest email could not be sent: {}", self),
            ErrorCategory::Storage => format!("Ledger storage problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_write_error() -> DigestError {
        DigestError::Ledger(LedgerError::Write {
            path: "sent_jobs.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }

    #[test]
    fn test_config_errors_exit_non_zero() {
        let err = DigestError::MissingConfigError {
            field: "mail.password".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().contains("mail.password"));
    }

    #[test]
    fn test_decode_error_is_data_category() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = DigestError::from(FetchError::Decode(source));
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_ledger_write_failure_does_not_fail_the_run() {
        let err = ledger_write_error();
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_delivery_error_is_low_severity() {
        let err = DigestError::from(DeliveryError::Rejected("550 mailbox unavailable".into()));
        assert_eq!(err.category(), ErrorCategory::Delivery);
        assert_eq!(err.exit_code(), 0);
    }
}
