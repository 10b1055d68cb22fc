//! Error types for UniMAC manager operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. Each variant maps
//! to the QuarterDeck status code the ioctl layer hands back to userspace,
//! see [`UnmError::status`].

use qd_hal::{GtStatus, HalError};
use std::io;
use thiserror::Error;
use unimac_types::{PortId, VlanId};

/// Result type alias for manager operations.
pub type UnmResult<T> = Result<T, UnmError>;

/// Errors that can occur during manager operations.
#[derive(Debug, Error)]
pub enum UnmError {
    /// `initialize` has not completed.
    #[error("UniMAC manager is not initialized")]
    NotInitialized,

    /// The target VLAN was never created.
    #[error("VLAN {vid} has not been created")]
    VlanNotCreated {
        /// The VLAN id.
        vid: VlanId,
    },

    /// Out-of-range or otherwise unusable argument.
    #[error("Bad parameter {param}: {message}")]
    BadParam {
        /// The offending parameter.
        param: String,
        /// Error message.
        message: String,
    },

    /// A port-control call failed. Earlier hardware writes of the same
    /// operation are not rolled back.
    #[error("Hardware {operation} on port {port} failed: {source}")]
    HardwareFailure {
        /// The facade call that failed.
        operation: &'static str,
        /// The port it targeted.
        port: PortId,
        /// The underlying hardware error.
        #[source]
        source: HalError,
    },

    /// The net-config store has nothing to hand out.
    #[error("Net config unavailable: {reason}")]
    NetConfigUnavailable {
        /// Why the store could not answer.
        reason: String,
    },

    /// Configuration file or boot string could not be used.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl UnmError {
    /// Creates a bad parameter error.
    pub fn bad_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadParam {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Creates a hardware failure error.
    pub fn hardware(operation: &'static str, port: PortId, source: HalError) -> Self {
        Self::HardwareFailure {
            operation,
            port,
            source,
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a net config unavailable error.
    pub fn net_config_unavailable(reason: impl Into<String>) -> Self {
        Self::NetConfigUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns true for the not-initialized class: the manager itself or the
    /// target VLAN.
    pub fn is_not_initialized(&self) -> bool {
        matches!(
            self,
            UnmError::NotInitialized | UnmError::VlanNotCreated { .. }
        )
    }

    pub fn is_bad_param(&self) -> bool {
        matches!(self, UnmError::BadParam { .. })
    }

    pub fn is_hardware_failure(&self) -> bool {
        matches!(self, UnmError::HardwareFailure { .. })
    }

    /// Returns the status code reported to the ioctl caller.
    pub fn status(&self) -> GtStatus {
        match self {
            UnmError::NotInitialized | UnmError::VlanNotCreated { .. } => {
                GtStatus::NotInitialized
            }
            UnmError::BadParam { .. } => GtStatus::BadParam,
            UnmError::HardwareFailure { source, .. } => match source.status() {
                GtStatus::Ok => GtStatus::Fail,
                status => status,
            },
            UnmError::NetConfigUnavailable { .. } | UnmError::Config { .. } | UnmError::Io(_) => {
                GtStatus::Fail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(i: u8) -> PortId {
        PortId::new(i).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = UnmError::bad_param("port", "port 5 is the CPU port");
        assert_eq!(err.to_string(), "Bad parameter port: port 5 is the CPU port");

        let err = UnmError::VlanNotCreated {
            vid: VlanId::new(7).unwrap(),
        };
        assert_eq!(err.to_string(), "VLAN 7 has not been created");
    }

    #[test]
    fn test_hardware_failure_keeps_source() {
        let err = UnmError::hardware(
            "set_port_state",
            port(2),
            HalError::from_status(GtStatus::Fail),
        );
        assert!(err.to_string().contains("set_port_state on port 2"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_hardware_failure());
    }

    #[test]
    fn test_classification() {
        assert!(UnmError::NotInitialized.is_not_initialized());
        assert!(UnmError::VlanNotCreated {
            vid: VlanId::ISOLATED
        }
        .is_not_initialized());
        assert!(!UnmError::bad_param("vid", "x").is_not_initialized());
        assert!(UnmError::bad_param("vid", "x").is_bad_param());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(UnmError::NotInitialized.status(), GtStatus::NotInitialized);
        assert_eq!(
            UnmError::VlanNotCreated { vid: VlanId::DISABLED }.status(),
            GtStatus::NotInitialized
        );
        assert_eq!(UnmError::bad_param("port", "x").status(), GtStatus::BadParam);
        assert_eq!(
            UnmError::hardware("set_port_group", port(0), HalError::Timeout).status(),
            GtStatus::Timeout
        );
        assert_eq!(UnmError::config("bad").status(), GtStatus::Fail);
    }
}
