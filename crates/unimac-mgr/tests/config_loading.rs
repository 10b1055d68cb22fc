//! Config file to running manager

mod common;

use std::fs;
use std::sync::Arc;

use common::{assert_consistent, port, ports, vid};
use pretty_assertions::assert_eq;
use qd_hal::{PortState, SimulatedSwitch};
use tempfile::TempDir;
use unimac_mgr::{
    BoardProfile, NetConfigStore, UnimacConfig, UnmError, UnmManager, UnmResult,
};
use unimac_types::{MacAddress, VlanId};

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("unimac.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Mirrors the unimacd start-up sequence.
fn start(config: &UnimacConfig) -> UnmResult<(UnmManager, Arc<NetConfigStore>, Arc<SimulatedSwitch>)> {
    config.validate()?;
    let layout = config.layout()?;

    let store = Arc::new(NetConfigStore::new());
    if let Some(net_config) = config.net_config(&layout)? {
        store.set(net_config);
    }

    let switch = Arc::new(SimulatedSwitch::new(layout.num_ports()));
    let manager = UnmManager::new(layout, switch.clone(), store.clone())
        .with_fallback(config.switch.board.default_config_for(&layout));
    manager.initialize()?;
    manager.sync_vlans()?;
    Ok((manager, store, switch))
}

#[test]
fn test_missing_file_uses_generic_board() {
    let dir = TempDir::new().unwrap();
    let config = UnimacConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.switch.board, BoardProfile::Generic);

    let (manager, store, _) = start(&config).unwrap();
    assert!(!store.is_configured());
    assert_eq!(manager.num_of_vlans().unwrap(), 2);
    assert_eq!(manager.port_mask_of_vid(vid(2)).unwrap(), ports(&[1, 2, 3, 4]));
}

#[test]
fn test_malformed_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[switch\nboard = \"generic\"\n");

    let err = UnimacConfig::load_or_default(&path).unwrap_err();
    assert!(matches!(err, UnmError::Config { .. }), "{:?}", err);
}

#[test]
fn test_boot_string_drives_initialization() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[switch]
board = "generic"

[netconf]
boot = "(00:11:22:33:44:55,1:0:0:0:0:0)(00:11:22:33:44:66,0:1:1:0:0:0)"
"#,
    );

    let config = UnimacConfig::load_or_default(&path).unwrap();
    let (manager, store, switch) = start(&config).unwrap();

    assert_eq!(manager.vid_of_port(port(0)).unwrap(), vid(1));
    assert_eq!(manager.port_mask_of_vid(vid(2)).unwrap(), ports(&[1, 2]));
    assert_eq!(
        manager.port_mask_of_vid(VlanId::DISABLED).unwrap(),
        ports(&[3, 4])
    );
    assert_eq!(switch.port_state(port(3)), Some(PortState::Disabled));
    assert_eq!(switch.port_state(port(4)), Some(PortState::Disabled));
    assert_eq!(
        store.vlan_mac(vid(2)),
        Some("00:11:22:33:44:66".parse::<MacAddress>().unwrap())
    );
    assert_consistent(&manager.snapshot().unwrap());
}

#[test]
fn test_port_tables_drive_initialization() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[netconf.ports]
"0" = 1
"1" = 1
"2" = 11
"3" = 11
"4" = 0

[[netconf.vlans]]
vid = 1
name = "wan"
"#,
    );

    let config = UnimacConfig::load_or_default(&path).unwrap();
    let (manager, store, switch) = start(&config).unwrap();

    assert_eq!(manager.num_of_vlans().unwrap(), 1);
    assert_eq!(manager.cpu_port_mask().unwrap(), ports(&[0, 1]));
    assert_eq!(switch.port_group(port(2)), Some(ports(&[3])));
    assert_eq!(switch.port_group(port(5)), Some(ports(&[0, 1])));
    assert_eq!(store.vlan_name(vid(1)).as_deref(), Some("wan"));
    assert_consistent(&manager.snapshot().unwrap());
}

#[test]
fn test_voip_board_fallback() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[switch]\nboard = \"voip-gateway\"\n");

    let config = UnimacConfig::load_or_default(&path).unwrap();
    let (manager, _, _) = start(&config).unwrap();

    assert_eq!(manager.layout().num_ports(), 7);
    assert_eq!(manager.vid_of_port(port(4)).unwrap(), vid(1));
    assert!(manager.vid_of_port(port(3)).unwrap_err().is_bad_param());
    assert_consistent(&manager.snapshot().unwrap());
}

#[test]
fn test_cpu_port_override_without_netconf() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[switch]\ncpu_port = 0\n");

    let config = UnimacConfig::load_or_default(&path).unwrap();
    config.validate().unwrap();
    let (manager, store, switch) = start(&config).unwrap();

    assert!(!store.is_configured());
    assert!(manager.vid_of_port(port(0)).unwrap_err().is_bad_param());
    assert_eq!(manager.port_mask_of_vid(vid(2)).unwrap(), ports(&[1, 2, 3, 4]));
    assert_eq!(manager.vid_of_port(port(5)).unwrap(), VlanId::DISABLED);
    assert_eq!(switch.port_state(port(5)), Some(PortState::Disabled));
    assert_eq!(manager.num_of_vlans().unwrap(), 1);
    assert_consistent(&manager.snapshot().unwrap());
}

#[test]
fn test_resized_switch_without_netconf() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[switch]\nnum_ports = 4\ncpu_port = 3\n");

    let config = UnimacConfig::load_or_default(&path).unwrap();
    let (manager, _, _) = start(&config).unwrap();

    assert_eq!(manager.layout().num_ports(), 4);
    assert_eq!(manager.vid_of_port(port(0)).unwrap(), vid(1));
    assert_eq!(manager.port_mask_of_vid(vid(2)).unwrap(), ports(&[1, 2]));
    assert!(manager.vid_of_port(port(4)).unwrap_err().is_bad_param());
    assert_consistent(&manager.snapshot().unwrap());
}

#[test]
fn test_boot_string_claiming_cpu_port_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "[netconf]\nboot = \"(00:11:22:33:44:55,1:0:0:0:0:1)\"\n",
    );

    let config = UnimacConfig::load_or_default(&path).unwrap();
    let err = start(&config).err().unwrap();
    assert!(matches!(err, UnmError::Config { .. }), "{:?}", err);
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.toml");

    let mut config = UnimacConfig::default();
    config.switch.board = BoardProfile::VoipGateway;
    config.netconf.ports.insert("4".to_string(), 1);
    config.save(&path).unwrap();

    let reloaded = UnimacConfig::load_or_default(&path).unwrap();
    assert_eq!(reloaded.switch.board, BoardProfile::VoipGateway);
    assert_eq!(reloaded.netconf.ports.get("4"), Some(&1));

    let (manager, _, _) = start(&reloaded).unwrap();
    assert_eq!(manager.vid_of_port(port(4)).unwrap(), vid(1));
    // Ports left out of the tables start disabled
    assert_eq!(manager.vid_of_port(port(0)).unwrap(), VlanId::DISABLED);
}
