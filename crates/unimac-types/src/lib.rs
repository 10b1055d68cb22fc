//! Common types for the UniMAC switch port/VLAN manager.
//!
//! This crate provides type-safe representations of the primitives shared by
//! the hardware layer and the manager:
//!
//! - [`VlanId`]: UniMAC VLAN identifiers, including the reserved
//!   DISABLED and ISOLATED ids
//! - [`PortId`]: physical switch port index
//! - [`PortSet`]: fixed-capacity set of switch ports (hardware port mask)
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses

mod mac;
mod port;
mod vlan;

pub use mac::MacAddress;
pub use port::{PortId, PortSet};
pub use vlan::VlanId;

/// Highest number of switch ports a UniMAC switch can expose, CPU port
/// excluded. Every per-port table is sized `MAX_SWITCH_PORTS + 1`.
pub const MAX_SWITCH_PORTS: u8 = 10;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid VLAN ID: {0}")]
    InvalidVlanId(u16),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("port {0} out of range")]
    PortOutOfRange(u16),
}
