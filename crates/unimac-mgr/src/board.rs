//! Board profiles: switch layout and fallback port assignment per board.

use crate::error::UnmError;
use crate::layout::SwitchLayout;
use crate::netconf::NetConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unimac_types::{PortId, VlanId};

const fn board_port(index: u8) -> PortId {
    match PortId::checked(index) {
        Some(port) => port,
        None => panic!("board port out of range"),
    }
}

const fn board_vid(id: u8) -> VlanId {
    match VlanId::checked(id) {
        Some(vid) => vid,
        None => panic!("board VLAN out of range"),
    }
}

const WAN_VID: VlanId = board_vid(1);
const LAN_VID: VlanId = board_vid(2);

const GENERIC_CPU_PORT: PortId = board_port(5);
const VOIP_CPU_PORT: PortId = board_port(3);

/// Known board variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardProfile {
    /// Five user ports, port 0 WAN, ports 1-4 LAN, CPU on port 5.
    #[default]
    Generic,
    /// RD-88F5181L VoIP gateway, CPU on port 3.
    VoipGateway,
}

impl BoardProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardProfile::Generic => "generic",
            BoardProfile::VoipGateway => "voip-gateway",
        }
    }

    fn num_ports(&self) -> u8 {
        match self {
            BoardProfile::Generic => 6,
            BoardProfile::VoipGateway => 7,
        }
    }

    fn cpu_port(&self) -> PortId {
        match self {
            BoardProfile::Generic => GENERIC_CPU_PORT,
            BoardProfile::VoipGateway => VOIP_CPU_PORT,
        }
    }

    /// VLAN of each port, CPU port slot included and ignored.
    fn assignment(&self) -> &'static [u8] {
        match self {
            BoardProfile::Generic => &[1, 2, 2, 2, 2, 0],
            BoardProfile::VoipGateway => &[2, 2, 2, 0, 1, 2, 0],
        }
    }

    /// The board's switch layout.
    pub fn layout(&self) -> SwitchLayout {
        SwitchLayout::from_parts(self.num_ports(), self.cpu_port())
    }

    /// Assignment used when the net-config store has nothing.
    pub fn default_config(&self) -> NetConfig {
        self.default_config_for(&self.layout())
    }

    /// The board assignment restricted to the user ports of `layout`.
    ///
    /// Used when `[switch]` overrides move the CPU port or resize the switch.
    /// Ports the board table does not cover are left out, so the manager
    /// starts them DISABLED; the board's own CPU slot is DISABLED already.
    pub fn default_config_for(&self, layout: &SwitchLayout) -> NetConfig {
        let assignment = self.assignment();
        let vid_of_port = layout
            .user_ports()
            .filter_map(|port| {
                let vid = VlanId::new(*assignment.get(port.index())?).ok()?;
                Some((port, vid))
            })
            .collect();

        NetConfig {
            vid_of_port,
            ..NetConfig::new()
        }
        .with_vlan(WAN_VID, "wan", None)
        .with_vlan(LAN_VID, "lan", None)
    }
}

impl fmt::Display for BoardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoardProfile {
    type Err = UnmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" => Ok(BoardProfile::Generic),
            "voip-gateway" | "voip_gateway" | "voip" => Ok(BoardProfile::VoipGateway),
            other => Err(UnmError::config(format!("unknown board \"{}\"", other))),
        }
    }
}
