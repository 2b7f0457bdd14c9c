//! DynamoDB error mapping
//!
//! Maps AWS SDK errors onto [`StoreError`]. Conditional-check failures are
//! left to the calling operation, which knows whether they mean
//! "already exists" or "not found".

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::error::Error as StdError;
use std::fmt::Debug;

use crate::error::StoreError;

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";

/// Error codes that indicate a transient condition on the service side
const TRANSIENT_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
    "InternalServerError",
    "ServiceUnavailable",
];

/// Map any DynamoDB operation error to a [`StoreError`]
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, table: &str) -> StoreError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: Debug,
{
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StoreError::Connection(DisplayErrorContext(&err).to_string())
        }
        SdkError::ServiceError(service_err) => {
            let error = service_err.err();
            let message = error.message().unwrap_or("no message").to_string();
            match error.code() {
                Some("ResourceNotFoundException") => StoreError::TableNotFound {
                    table: table.to_string(),
                },
                Some(code) if TRANSIENT_CODES.contains(&code) => {
                    StoreError::Connection(format!("{}: {}", code, message))
                }
                Some(code) => StoreError::Backend(format!("{}: {}", code, message)),
                None => StoreError::Backend(DisplayErrorContext(&err).to_string()),
            }
        }
        _ => StoreError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

/// Check if the request was rejected by its condition expression
pub fn is_conditional_check_failed<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == CONDITIONAL_CHECK_FAILED)
}
