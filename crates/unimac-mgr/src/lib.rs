//! unimac-mgr - UniMAC VLAN/port-association manager
//!
//! Keeps the map from physical switch ports to logical VLANs and drives the
//! switch chip through [`qd_hal::PortControl`] so hardware follows it.
//!
//! Load sequence:
//! 1. build a [`NetConfigStore`] from [`UnimacConfig`] (file or boot string)
//! 2. [`UnmManager::initialize`] builds the tables and programs the reserved
//!    ISOLATED and DISABLED VLANs
//! 3. [`UnmManager::sync_vlans`] writes the port groups of the user VLANs
//!
//! After that, [`UnmManager::move_port`] and [`UnmManager::create_vlan`]
//! reconfigure the switch, and the query methods read the tables.

pub mod audit;
mod board;
pub mod config;
mod error;
mod layout;
mod manager;
mod netconf;
mod state;

pub use board::BoardProfile;
pub use config::{UnimacConfig, DEFAULT_CONFIG_PATH};
pub use error::{UnmError, UnmResult};
pub use layout::SwitchLayout;
pub use manager::UnmManager;
pub use netconf::{NetConfig, NetConfigSource, NetConfigStore, VlanNetConf};
pub use state::{UnmSnapshot, UnmTables, VlanSnapshot};
