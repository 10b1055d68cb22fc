//! The manager's owned tables.

use crate::layout::SwitchLayout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unimac_types::{PortId, PortSet, VlanId};

const PORT_SLOTS: usize = PortId::CAPACITY as usize;
const VID_SLOTS: usize = VlanId::MAX_VID as usize;

/// Live port/VLAN tables.
///
/// Only `initialize` builds a fresh value and only `move_port` mutates one.
/// `ports_of_vid` never holds the CPU port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmTables {
    pub(crate) vid_of_port: [VlanId; PORT_SLOTS],
    pub(crate) ports_of_vid: [PortSet; VID_SLOTS],
    pub(crate) num_ports_of_vid: [u8; VID_SLOTS],
    pub(crate) initiated_vids: [bool; VID_SLOTS],
    /// Non-CPU ports the CPU port must reach: members of every active VLAN.
    pub(crate) cpu_port_mask: PortSet,
    /// Initiated user VLANs, reserved ids excluded.
    pub(crate) number_of_vids: u8,
    pub(crate) initialized: bool,
}

impl Default for UnmTables {
    fn default() -> Self {
        Self::new()
    }
}

impl UnmTables {
    /// Empty tables with only the reserved VLANs initiated.
    pub fn new() -> Self {
        let mut initiated_vids = [false; VID_SLOTS];
        initiated_vids[VlanId::DISABLED.index()] = true;
        initiated_vids[VlanId::ISOLATED.index()] = true;

        Self {
            vid_of_port: [VlanId::DISABLED; PORT_SLOTS],
            ports_of_vid: [PortSet::empty(); VID_SLOTS],
            num_ports_of_vid: [0; VID_SLOTS],
            initiated_vids,
            cpu_port_mask: PortSet::empty(),
            number_of_vids: 0,
            initialized: false,
        }
    }

    /// Places `port` into `vid` while building the tables.
    pub(crate) fn assign(&mut self, port: PortId, vid: VlanId) {
        if !self.initiated_vids[vid.index()] {
            self.initiated_vids[vid.index()] = true;
            if vid.is_active() {
                self.number_of_vids += 1;
            }
        }
        self.vid_of_port[port.index()] = vid;
        if self.ports_of_vid[vid.index()].insert(port) {
            self.num_ports_of_vid[vid.index()] += 1;
        }
        if vid.is_active() {
            self.cpu_port_mask.insert(port);
        }
    }

    pub fn vid_of(&self, port: PortId) -> VlanId {
        self.vid_of_port[port.index()]
    }

    pub fn members(&self, vid: VlanId) -> PortSet {
        self.ports_of_vid[vid.index()]
    }

    pub fn member_count(&self, vid: VlanId) -> u8 {
        self.num_ports_of_vid[vid.index()]
    }

    pub fn is_initiated(&self, vid: VlanId) -> bool {
        self.initiated_vids[vid.index()]
    }

    pub fn cpu_port_mask(&self) -> PortSet {
        self.cpu_port_mask
    }

    pub fn number_of_vids(&self) -> u8 {
        self.number_of_vids
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Builds the port-group register value for `port`, given the member set
    /// of the VLAN it represents. The CPU port is added for active VLANs and
    /// the port itself is always removed.
    pub fn hw_group(layout: &SwitchLayout, port: PortId, vid: VlanId, members: PortSet) -> PortSet {
        let group = if vid.is_active() {
            members.with(layout.cpu_port())
        } else {
            members
        };
        group.without(port)
    }

    /// Checks the table invariants, returning the first violation.
    pub fn check_invariants(&self, layout: &SwitchLayout) -> Result<(), String> {
        let cpu = layout.cpu_port();

        for vid in VlanId::all() {
            let members = self.members(vid);
            if members.contains(cpu) {
                return Err(format!("VLAN {} holds the CPU port", vid));
            }
            if members.len() != self.member_count(vid) {
                return Err(format!(
                    "VLAN {} count {} != popcount {}",
                    vid,
                    self.member_count(vid),
                    members.len()
                ));
            }
            if !members.is_empty() && !self.is_initiated(vid) {
                return Err(format!("VLAN {} has members but is not initiated", vid));
            }
            if vid.is_active() && !members.is_empty() {
                let missing = members.iter().find(|p| !self.cpu_port_mask.contains(*p));
                if let Some(port) = missing {
                    return Err(format!(
                        "port {} of active VLAN {} unreachable from CPU",
                        port, vid
                    ));
                }
            }
        }

        for port in layout.user_ports() {
            let vid = self.vid_of(port);
            if !self.is_initiated(vid) {
                return Err(format!("port {} in uninitiated VLAN {}", port, vid));
            }
            let owners = VlanId::all()
                .filter(|v| self.members(*v).contains(port))
                .count();
            if owners != 1 || !self.members(vid).contains(port) {
                return Err(format!(
                    "port {} in {} VLAN sets, expected only VLAN {}",
                    port, owners, vid
                ));
            }
            if self.cpu_port_mask.contains(port) != vid.is_active() {
                return Err(format!("CPU mask out of sync for port {}", port));
            }
        }

        let user_vlans = VlanId::user_vids()
            .filter(|v| self.is_initiated(*v))
            .count();
        if user_vlans != usize::from(self.number_of_vids) {
            return Err(format!(
                "number_of_vids {} != {} initiated user VLANs",
                self.number_of_vids, user_vlans
            ));
        }

        Ok(())
    }

    /// Copies the tables into a serialisable view.
    pub fn snapshot(&self, layout: &SwitchLayout) -> UnmSnapshot {
        let vid_of_port = layout
            .user_ports()
            .map(|port| (port, self.vid_of(port)))
            .collect();
        let vlans = VlanId::all()
            .filter(|vid| self.is_initiated(*vid))
            .map(|vid| {
                (
                    vid,
                    VlanSnapshot {
                        members: self.members(vid),
                        count: self.member_count(vid),
                    },
                )
            })
            .collect();

        UnmSnapshot {
            layout: *layout,
            vid_of_port,
            vlans,
            cpu_port_mask: self.cpu_port_mask,
            number_of_vids: self.number_of_vids,
        }
    }
}

/// Membership of one initiated VLAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanSnapshot {
    pub members: PortSet,
    pub count: u8,
}

/// Point-in-time copy of the manager tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmSnapshot {
    pub layout: SwitchLayout,
    pub vid_of_port: BTreeMap<PortId, VlanId>,
    /// Initiated VLANs only, reserved ones included.
    pub vlans: BTreeMap<VlanId, VlanSnapshot>,
    pub cpu_port_mask: PortSet,
    pub number_of_vids: u8,
}
