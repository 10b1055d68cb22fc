//! Net-config store: the externally supplied port-to-VLAN assignment.
//!
//! The manager reads a [`NetConfig`] once, at initialization, through the
//! [`NetConfigSource`] trait. [`NetConfigStore`] is the in-memory source fed
//! from the config file or the `netconfig=` boot parameter.

use crate::error::{UnmError, UnmResult};
use crate::layout::SwitchLayout;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use unimac_types::{MacAddress, PortId, VlanId};

/// Display attributes of one VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanNetConf {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
}

/// Initial port-to-VLAN assignment plus per-VLAN display data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    pub vid_of_port: BTreeMap<PortId, VlanId>,
    pub vlans: BTreeMap<VlanId, VlanNetConf>,
}

impl NetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `port` to `vid`.
    #[must_use]
    pub fn with_port(mut self, port: PortId, vid: VlanId) -> Self {
        self.vid_of_port.insert(port, vid);
        self
    }

    /// Sets the display attributes of `vid`.
    #[must_use]
    pub fn with_vlan(mut self, vid: VlanId, name: impl Into<String>, mac: Option<MacAddress>) -> Self {
        self.vlans.insert(
            vid,
            VlanNetConf {
                name: name.into(),
                mac,
            },
        );
        self
    }

    pub fn vid_of(&self, port: PortId) -> Option<VlanId> {
        self.vid_of_port.get(&port).copied()
    }

    /// Checks that every entry names a user port of `layout`.
    pub fn validate(&self, layout: &SwitchLayout) -> UnmResult<()> {
        self.vid_of_port
            .keys()
            .try_for_each(|port| layout.check_user_port(*port))
    }

    /// Parses the `netconfig=` boot parameter.
    ///
    /// The format is one parenthesised group per user VLAN,
    /// `(<mac>,<f0>:<f1>:...:<fN-1>)`, with one `0`/`1` flag per switch port.
    /// Groups are numbered from VLAN 1 in order of appearance and named
    /// `eth0`, `eth1`, ... User ports no group claims are DISABLED.
    pub fn parse(s: &str, layout: &SwitchLayout) -> UnmResult<Self> {
        let mut config = NetConfig::new();
        let mut rest = s.trim();
        let mut group = 0u8;

        while !rest.is_empty() {
            let body = rest
                .strip_prefix('(')
                .ok_or_else(|| UnmError::config(format!("expected '(' at \"{}\"", rest)))?;
            let end = body
                .find(')')
                .ok_or_else(|| UnmError::config("unbalanced parentheses in netconfig"))?;
            let inner = &body[..end];
            if inner.contains('(') {
                return Err(UnmError::config("unbalanced parentheses in netconfig"));
            }
            rest = body[end + 1..].trim_start();

            let vid = group
                .checked_add(1)
                .filter(|id| *id < VlanId::ISOLATED.as_u8())
                .and_then(|id| VlanId::new(id).ok())
                .ok_or_else(|| {
                    UnmError::config(format!(
                        "more than {} VLAN groups",
                        VlanId::ISOLATED.as_u8() - 1
                    ))
                })?;
            config.parse_group(inner, vid, group, layout)?;
            group += 1;
        }

        if group == 0 {
            return Err(UnmError::config("netconfig names no VLAN group"));
        }

        for port in layout.user_ports() {
            config.vid_of_port.entry(port).or_insert(VlanId::DISABLED);
        }

        debug!("Parsed netconfig with {} VLAN groups", group);
        Ok(config)
    }

    fn parse_group(&mut self, inner: &str, vid: VlanId, group: u8, layout: &SwitchLayout) -> UnmResult<()> {
        let (mac, flags) = inner
            .split_once(',')
            .ok_or_else(|| UnmError::config(format!("group \"{}\" has no port flags", inner)))?;
        let mac: MacAddress = mac
            .trim()
            .parse()
            .map_err(|e: unimac_types::ParseError| UnmError::config(e.to_string()))?;
        if mac.is_multicast() || mac.is_zero() {
            return Err(UnmError::config(format!(
                "group {} MAC {} is not a unicast address",
                group, mac
            )));
        }

        let flags: Vec<&str> = flags.split(':').map(str::trim).collect();
        if flags.len() != usize::from(layout.num_ports()) {
            return Err(UnmError::config(format!(
                "group {} has {} port flags, switch has {} ports",
                group,
                flags.len(),
                layout.num_ports()
            )));
        }

        for (port, flag) in layout.ports().zip(flags) {
            match flag {
                "0" => {}
                "1" => {
                    if layout.is_cpu(port) {
                        return Err(UnmError::config(format!(
                            "group {} claims CPU port {}",
                            group, port
                        )));
                    }
                    if let Some(owner) = self.vid_of_port.insert(port, vid) {
                        return Err(UnmError::config(format!(
                            "port {} claimed by VLAN {} and VLAN {}",
                            port, owner, vid
                        )));
                    }
                }
                other => {
                    return Err(UnmError::config(format!(
                        "bad port flag \"{}\" in group {}",
                        other, group
                    )))
                }
            }
        }

        self.vlans.insert(
            vid,
            VlanNetConf {
                name: format!("eth{}", group),
                mac: Some(mac),
            },
        );
        Ok(())
    }

    /// Formats the config back into the boot-parameter form.
    ///
    /// Only user VLANs with a MAC are emitted, in ascending order, so a config
    /// whose VLAN ids are not contiguous from 1 comes back renumbered.
    pub fn to_boot_string(&self, layout: &SwitchLayout) -> String {
        self.vlans
            .iter()
            .filter(|(vid, _)| vid.is_active())
            .filter_map(|(vid, vlan)| {
                let flags: Vec<&str> = layout
                    .ports()
                    .map(|port| if self.vid_of(port) == Some(*vid) { "1" } else { "0" })
                    .collect();
                vlan.mac.map(|mac| format!("({},{})", mac, flags.join(":")))
            })
            .collect()
    }
}

/// Supplier of the initial assignment.
pub trait NetConfigSource: Send + Sync {
    /// Returns the current config, or `NetConfigUnavailable`.
    fn net_config(&self) -> UnmResult<NetConfig>;
}

impl NetConfigSource for NetConfig {
    fn net_config(&self) -> UnmResult<NetConfig> {
        Ok(self.clone())
    }
}

/// In-memory net-config store.
#[derive(Debug, Default)]
pub struct NetConfigStore {
    config: RwLock<Option<NetConfig>>,
}

impl NetConfigStore {
    /// Creates an unconfigured store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NetConfig) -> Self {
        Self {
            config: RwLock::new(Some(config)),
        }
    }

    /// Replaces the stored config.
    pub fn set(&self, config: NetConfig) {
        *self.config.write() = Some(config);
    }

    pub fn clear(&self) {
        *self.config.write() = None;
    }

    pub fn is_configured(&self) -> bool {
        self.config.read().is_some()
    }

    pub fn vlan_name(&self, vid: VlanId) -> Option<String> {
        self.config
            .read()
            .as_ref()
            .and_then(|config| config.vlans.get(&vid))
            .map(|vlan| vlan.name.clone())
    }

    pub fn vlan_mac(&self, vid: VlanId) -> Option<MacAddress> {
        self.config
            .read()
            .as_ref()
            .and_then(|config| config.vlans.get(&vid))
            .and_then(|vlan| vlan.mac)
    }
}

impl NetConfigSource for NetConfigStore {
    fn net_config(&self) -> UnmResult<NetConfig> {
        self.config
            .read()
            .clone()
            .ok_or_else(|| UnmError::net_config_unavailable("net config store is not configured"))
    }
}
