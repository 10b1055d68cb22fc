//! QuarterDeck status codes and hardware error handling.
//!
//! `GtStatus` mirrors the raw `GT_STATUS` codes; `HalError` is what the
//! port-control calls return.

use std::fmt;
use thiserror::Error;

/// QuarterDeck status codes matching `GT_STATUS` in `gtDefs.h`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GtStatus {
    Ok = 0x00,
    Fail = 0x01,
    BadValue = 0x02,
    OutOfRange = 0x03,
    BadParam = 0x04,
    NotFound = 0x0B,
    Timeout = 0x0E,
    NotSupported = 0x10,
    NotInitialized = 0x12,
    NoResource = 0x13,
}

impl GtStatus {
    /// Returns the raw code.
    pub fn as_raw(&self) -> u32 {
        *self as u32
    }
}

impl fmt::Display for GtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GtStatus::Ok => "GT_OK",
            GtStatus::Fail => "GT_FAIL",
            GtStatus::BadValue => "GT_BAD_VALUE",
            GtStatus::OutOfRange => "GT_OUT_OF_RANGE",
            GtStatus::BadParam => "GT_BAD_PARAM",
            GtStatus::NotFound => "GT_NOT_FOUND",
            GtStatus::Timeout => "GT_TIMEOUT",
            GtStatus::NotSupported => "GT_NOT_SUPPORTED",
            GtStatus::NotInitialized => "GT_NOT_INITIALIZED",
            GtStatus::NoResource => "GT_NO_RESOURCE",
        };
        write!(f, "{}", s)
    }
}

/// Error type for port-control operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The QuarterDeck API returned an error status.
    #[error("QuarterDeck operation failed: {status}")]
    Status { status: GtStatus },

    /// The chip does not support the requested feature.
    #[error("Feature not supported: {feature}")]
    NotSupported { feature: String },

    /// Invalid parameter passed to the QuarterDeck API.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// SMI/MII access timed out.
    #[error("Register access timed out")]
    Timeout,

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HalError {
    /// Creates an error from a QuarterDeck status code.
    pub fn from_status(status: GtStatus) -> Self {
        match status {
            GtStatus::Ok => HalError::Internal {
                message: "from_status called with GT_OK".to_string(),
            },
            GtStatus::NotSupported => HalError::NotSupported {
                feature: "unknown".to_string(),
            },
            GtStatus::BadParam | GtStatus::BadValue | GtStatus::OutOfRange => {
                HalError::InvalidParameter {
                    message: format!("QuarterDeck returned {}", status),
                }
            }
            GtStatus::Timeout => HalError::Timeout,
            _ => HalError::Status { status },
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        HalError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Returns the status code the ioctl layer reports for this error.
    pub fn status(&self) -> GtStatus {
        match self {
            HalError::Status { status } => *status,
            HalError::NotSupported { .. } => GtStatus::NotSupported,
            HalError::InvalidParameter { .. } => GtStatus::BadParam,
            HalError::Timeout => GtStatus::Timeout,
            HalError::Internal { .. } => GtStatus::Fail,
        }
    }
}

/// Result type for port-control operations.
pub type HalResult<T> = Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_raw_codes() {
        assert_eq!(GtStatus::Ok.as_raw(), 0x00);
        assert_eq!(GtStatus::BadParam.as_raw(), 0x04);
        assert_eq!(GtStatus::NotInitialized.as_raw(), 0x12);
    }

    #[test]
    fn test_error_from_status() {
        assert!(matches!(
            HalError::from_status(GtStatus::BadValue),
            HalError::InvalidParameter { .. }
        ));
        assert_eq!(HalError::from_status(GtStatus::Timeout), HalError::Timeout);
        assert_eq!(
            HalError::from_status(GtStatus::NoResource),
            HalError::Status {
                status: GtStatus::NoResource
            }
        );
    }

    #[test]
    fn test_error_status_round_trip() {
        for status in [GtStatus::Fail, GtStatus::NoResource, GtStatus::NotInitialized] {
            assert_eq!(HalError::from_status(status).status(), status);
        }
        assert_eq!(
            HalError::invalid_parameter("port 12").status(),
            GtStatus::BadParam
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(GtStatus::NotInitialized.to_string(), "GT_NOT_INITIALIZED");
        let err = HalError::from_status(GtStatus::Fail);
        assert_eq!(err.to_string(), "QuarterDeck operation failed: GT_FAIL");
    }
}
