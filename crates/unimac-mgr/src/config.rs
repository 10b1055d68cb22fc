//! Configuration file support for unimacd
//!
//! Loads and validates the switch layout and initial port assignment from a
//! TOML file. Default location: /etc/unimac/unimac.toml
//!
//! ```toml
//! [switch]
//! board = "generic"
//!
//! [netconf]
//! boot = "(00:11:22:33:44:55,1:0:0:0:0:0)(00:11:22:33:44:66,0:1:1:1:1:0)"
//! ```
//!
//! Instead of `boot`, the assignment can be spelled out:
//!
//! ```toml
//! [netconf.ports]
//! "0" = 1
//! "1" = 2
//!
//! [[netconf.vlans]]
//! vid = 1
//! name = "wan"
//! mac = "00:11:22:33:44:55"
//! ```

use crate::board::BoardProfile;
use crate::error::{UnmError, UnmResult};
use crate::layout::SwitchLayout;
use crate::netconf::NetConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use unimac_types::{MacAddress, PortId, VlanId};

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/unimac/unimac.toml";

/// Switch hardware section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwitchConfig {
    /// Board variant, picks the layout and the fallback assignment
    #[serde(default)]
    pub board: BoardProfile,

    /// Overrides the board's port count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ports: Option<u8>,

    /// Overrides the board's CPU port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_port: Option<u8>,
}

/// One `[[netconf.vlans]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlanEntry {
    pub vid: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
}

/// Initial assignment section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetConfSection {
    /// `netconfig=` boot string, preferred over the tables below
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot: Option<String>,

    /// Port index -> VLAN id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<String, u8>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vlans: Vec<VlanEntry>,
}

impl NetConfSection {
    fn has_tables(&self) -> bool {
        !self.ports.is_empty() || !self.vlans.is_empty()
    }
}

/// Complete unimacd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnimacConfig {
    #[serde(default)]
    pub switch: SwitchConfig,

    #[serde(default)]
    pub netconf: NetConfSection,
}

impl UnimacConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> UnmResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config = toml::from_str(&content).map_err(|e| {
                    UnmError::config(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(UnmError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> UnmResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| UnmError::config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The board layout with the `[switch]` overrides applied.
    pub fn layout(&self) -> UnmResult<SwitchLayout> {
        let base = self.switch.board.layout();
        let num_ports = self.switch.num_ports.unwrap_or(base.num_ports());
        let cpu_port = self.switch.cpu_port.unwrap_or(base.cpu_port().as_u8());

        SwitchLayout::new(num_ports, cpu_port).map_err(|e| UnmError::config(e.to_string()))
    }

    /// Builds the initial assignment for `layout`.
    ///
    /// Returns `None` when the file gives neither a boot string nor tables,
    /// leaving the board default to the manager.
    pub fn net_config(&self, layout: &SwitchLayout) -> UnmResult<Option<NetConfig>> {
        if let Some(boot) = &self.netconf.boot {
            if self.netconf.has_tables() {
                warn!("Both netconf.boot and netconf tables given, using boot");
            }
            return NetConfig::parse(boot, layout).map(Some);
        }
        if !self.netconf.has_tables() {
            return Ok(None);
        }

        let mut config = NetConfig::new();
        for (key, raw_vid) in &self.netconf.ports {
            let port: PortId = key
                .parse()
                .map_err(|e| UnmError::config(format!("netconf.ports key \"{}\": {}", key, e)))?;
            layout
                .check_user_port(port)
                .map_err(|e| UnmError::config(format!("netconf.ports: {}", e)))?;
            let vid = VlanId::new(*raw_vid)
                .map_err(|e| UnmError::config(format!("netconf.ports.{}: {}", key, e)))?;
            config.vid_of_port.insert(port, vid);
        }

        for entry in &self.netconf.vlans {
            let vid = VlanId::new(entry.vid)
                .map_err(|e| UnmError::config(format!("netconf.vlans: {}", e)))?;
            let name = entry.name.clone().unwrap_or_else(|| format!("vlan{}", vid));
            config = config.with_vlan(vid, name, entry.mac);
        }

        Ok(Some(config))
    }

    /// Validate configuration
    pub fn validate(&self) -> UnmResult<()> {
        let layout = self.layout()?;
        self.net_config(&layout)?;
        Ok(())
    }
}
