//! Shared fixtures for the unimac-mgr integration tests

#![allow(dead_code)]

use std::sync::Arc;

use qd_hal::SimulatedSwitch;
use unimac_mgr::{BoardProfile, NetConfig, NetConfigStore, UnmManager, UnmSnapshot};
use unimac_types::{PortId, PortSet, VlanId};

pub fn port(i: u8) -> PortId {
    PortId::new(i).unwrap()
}

pub fn vid(i: u8) -> VlanId {
    VlanId::new(i).unwrap()
}

pub fn ports(list: &[u8]) -> PortSet {
    list.iter().map(|i| port(*i)).collect()
}

/// Generic 6-port board with an empty store, so the board default applies.
pub fn generic_manager() -> (Arc<UnmManager>, Arc<SimulatedSwitch>) {
    let board = BoardProfile::Generic;
    let switch = Arc::new(SimulatedSwitch::new(board.layout().num_ports()));
    let manager = UnmManager::new(board.layout(), switch.clone(), Arc::new(NetConfigStore::new()))
        .with_fallback(board.default_config());
    (Arc::new(manager), switch)
}

/// Generic board initialized from `config`, with the op log cleared.
pub fn manager_with(config: NetConfig) -> (Arc<UnmManager>, Arc<SimulatedSwitch>) {
    let board = BoardProfile::Generic;
    let switch = Arc::new(SimulatedSwitch::new(board.layout().num_ports()));
    let manager = UnmManager::new(
        board.layout(),
        switch.clone(),
        Arc::new(NetConfigStore::with_config(config)),
    );
    manager.initialize().unwrap();
    switch.clear_ops();
    (Arc::new(manager), switch)
}

/// Initialized generic board with the op log cleared.
pub fn initialized_manager() -> (Arc<UnmManager>, Arc<SimulatedSwitch>) {
    let (manager, switch) = generic_manager();
    manager.initialize().unwrap();
    switch.clear_ops();
    (manager, switch)
}

/// Checks the table invariants through the public snapshot.
pub fn assert_consistent(snapshot: &UnmSnapshot) {
    let cpu = snapshot.layout.cpu_port();
    assert!(!snapshot.vid_of_port.contains_key(&cpu), "cpu port has a VLAN");

    for (port, vid) in &snapshot.vid_of_port {
        let vlan = snapshot
            .vlans
            .get(vid)
            .unwrap_or_else(|| panic!("port {} in uninitiated VLAN {}", port, vid));
        assert!(vlan.members.contains(*port), "port {} missing from VLAN {}", port, vid);

        let owners = snapshot
            .vlans
            .values()
            .filter(|other| other.members.contains(*port))
            .count();
        assert_eq!(owners, 1, "port {} in {} VLANs", port, owners);
    }

    let mut expected_cpu_mask = PortSet::empty();
    let mut active = 0;
    for (vid, vlan) in &snapshot.vlans {
        assert_eq!(vlan.count, vlan.members.len(), "VLAN {} count", vid);
        assert!(!vlan.members.contains(cpu), "cpu port in VLAN {}", vid);
        if vid.is_active() {
            active += 1;
            expected_cpu_mask = expected_cpu_mask.union(vlan.members);
        }
    }
    assert_eq!(snapshot.cpu_port_mask, expected_cpu_mask);
    assert_eq!(snapshot.number_of_vids, active);
}
