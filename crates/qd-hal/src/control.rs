//! The port-control facade consumed by the UniMAC manager.

use crate::error::HalResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use unimac_types::{PortId, PortSet, VlanId};

/// Spanning-tree forwarding state of a switch port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PortState {
    Disabled = 0,
    Blocking = 1,
    Learning = 2,
    Forwarding = 3,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Blocking => "blocking",
            Self::Learning => "learning",
            Self::Forwarding => "forwarding",
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware port-control operations.
///
/// Every call is synchronous and blocking. Implementations are not required
/// to be reentrant: the manager serializes all calls under its own lock.
pub trait PortControl: Send + Sync {
    /// Programs the set of ports `port` may forward to. `group` never
    /// contains `port` itself.
    fn set_port_group(&self, port: PortId, group: PortSet) -> HalResult<()>;

    /// Sets the spanning-tree forwarding state of `port`.
    fn set_port_state(&self, port: PortId, state: PortState) -> HalResult<()>;

    /// Sets the default VLAN id (PVID) used for untagged ingress on `port`.
    fn set_port_default_vid(&self, port: PortId, vid: VlanId) -> HalResult<()>;

    /// Joins `port` to `vid`. `members` is the VLAN membership after the join
    /// and `member_count` its size.
    fn associate_port(
        &self,
        port: PortId,
        vid: VlanId,
        members: PortSet,
        member_count: u8,
    ) -> HalResult<()>;

    /// Removes `port` from `vid` and flushes what the chip learned for it.
    /// `members` is the VLAN membership after the removal.
    fn disassociate_port(&self, port: PortId, vid: VlanId, members: PortSet) -> HalResult<()>;
}

/// Kind of a port-control call, used to target fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalOpKind {
    SetPortGroup,
    SetPortState,
    SetPortDefaultVid,
    AssociatePort,
    DisassociatePort,
}

/// A recorded port-control call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalOp {
    SetPortGroup {
        port: PortId,
        group: PortSet,
    },
    SetPortState {
        port: PortId,
        state: PortState,
    },
    SetPortDefaultVid {
        port: PortId,
        vid: VlanId,
    },
    AssociatePort {
        port: PortId,
        vid: VlanId,
        members: PortSet,
        member_count: u8,
    },
    DisassociatePort {
        port: PortId,
        vid: VlanId,
        members: PortSet,
    },
}

impl HalOp {
    pub fn kind(&self) -> HalOpKind {
        match self {
            HalOp::SetPortGroup { .. } => HalOpKind::SetPortGroup,
            HalOp::SetPortState { .. } => HalOpKind::SetPortState,
            HalOp::SetPortDefaultVid { .. } => HalOpKind::SetPortDefaultVid,
            HalOp::AssociatePort { .. } => HalOpKind::AssociatePort,
            HalOp::DisassociatePort { .. } => HalOpKind::DisassociatePort,
        }
    }

    /// The port the call targets.
    pub fn port(&self) -> PortId {
        match self {
            HalOp::SetPortGroup { port, .. }
            | HalOp::SetPortState { port, .. }
            | HalOp::SetPortDefaultVid { port, .. }
            | HalOp::AssociatePort { port, .. }
            | HalOp::DisassociatePort { port, .. } => *port,
        }
    }
}

impl fmt::Display for HalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalOp::SetPortGroup { port, group } => write!(f, "port {} group {}", port, group),
            HalOp::SetPortState { port, state } => write!(f, "port {} state {}", port, state),
            HalOp::SetPortDefaultVid { port, vid } => write!(f, "port {} pvid {}", port, vid),
            HalOp::AssociatePort {
                port,
                vid,
                members,
                member_count,
            } => write!(
                f,
                "port {} join vlan {} members {} ({})",
                port, vid, members, member_count
            ),
            HalOp::DisassociatePort { port, vid, members } => {
                write!(f, "port {} leave vlan {} members {}", port, vid, members)
            }
        }
    }
}
