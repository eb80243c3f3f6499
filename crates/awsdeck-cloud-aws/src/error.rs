//! AWS provider error types

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use awsdeck_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("{operation} failed: {code}: {message}")]
    Service {
        operation: &'static str,
        code: String,
        message: String,
    },

    #[error("{operation} could not reach AWS: {detail}")]
    Unreachable {
        operation: &'static str,
        detail: String,
    },

    #[error("{operation} returned no {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("Configuration required: {0}")]
    NotConfigured(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AwsError {
    /// AWS error code of a service error
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

/// Wrap an SDK error from any AWS service client.
pub(crate) fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        return AwsError::Unreachable {
            operation,
            detail: DisplayErrorContext(&err).to_string(),
        };
    }

    let service = err.as_service_error();
    AwsError::Service {
        operation,
        code: service
            .and_then(|e| e.code())
            .unwrap_or("Unknown")
            .to_string(),
        message: service
            .and_then(|e| e.message())
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string()),
    }
}

/// How an AWS error code maps onto the provider-neutral taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    InvalidState,
    QuotaExceeded,
    InvalidInput,
    Unavailable,
}

/// Classify an AWS error code and message.
pub fn classify(code: &str, message: &str) -> ErrorClass {
    let message = message.to_ascii_lowercase();

    if code.ends_with(".NotFound")
        || code == "NotFoundException"
        || code == "InvalidInstanceID.Malformed"
        || code == "InvalidAllocationID.Malformed"
    {
        return ErrorClass::NotFound;
    }

    if code == "IncorrectInstanceState" || code == "IncorrectState" {
        return ErrorClass::InvalidState;
    }

    if code.contains("LimitExceeded")
        || (message.contains("exceeded")
            && (message.contains("limit") || message.contains("quota")))
        || message.contains("maximum number")
    {
        return ErrorClass::QuotaExceeded;
    }

    // Lightsail reports most precondition failures as invalid input
    if code == "InvalidInputException" {
        if message.contains("state") {
            return ErrorClass::InvalidState;
        }
        if message.contains("does not exist") {
            return ErrorClass::NotFound;
        }
        return ErrorClass::InvalidInput;
    }

    ErrorClass::Unavailable
}

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        let detail = err.to_string();
        let class = match err {
            AwsError::IoError(io) => return CloudError::Io(io),
            AwsError::Service { code, message, .. } => classify(&code, &message),
            AwsError::Unreachable { .. } | AwsError::MissingField { .. } => {
                ErrorClass::Unavailable
            }
            AwsError::NotConfigured(_) => ErrorClass::InvalidInput,
        };

        match class {
            ErrorClass::NotFound => CloudError::ResourceNotFound(detail),
            ErrorClass::InvalidState => CloudError::InvalidState(detail),
            ErrorClass::QuotaExceeded => CloudError::QuotaExceeded(detail),
            ErrorClass::InvalidInput => CloudError::InvalidInput(detail),
            ErrorClass::Unavailable => CloudError::ProviderUnavailable(detail),
        }
    }
}
