//! In-memory QuarterDeck backend.
//!
//! `SimulatedSwitch` keeps the per-port registers the manager programs and a
//! log of every call it accepted. Faults can be armed to make a later call
//! fail, so partial-failure paths can be exercised without a board.

use crate::control::{HalOp, HalOpKind, PortControl, PortState};
use crate::error::{GtStatus, HalError, HalResult};
use log::{trace, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use unimac_types::{PortId, PortSet, VlanId};

#[derive(Debug, Clone, Copy)]
struct Fault {
    kind: HalOpKind,
    port: Option<PortId>,
    status: GtStatus,
}

impl Fault {
    fn matches(&self, op: &HalOp) -> bool {
        self.kind == op.kind() && self.port.map_or(true, |port| port == op.port())
    }
}

#[derive(Debug)]
struct SimState {
    groups: Vec<PortSet>,
    states: Vec<PortState>,
    default_vids: Vec<Option<VlanId>>,
    vlan_members: BTreeMap<VlanId, PortSet>,
    ops: Vec<HalOp>,
    faults: Vec<Fault>,
    fail_after: Option<(usize, GtStatus)>,
}

impl SimState {
    /// Returns the injected failure for `op`, consuming the fault.
    fn take_fault(&mut self, op: &HalOp) -> Option<GtStatus> {
        if let Some((remaining, status)) = self.fail_after {
            if remaining == 0 {
                self.fail_after = None;
                return Some(status);
            }
            self.fail_after = Some((remaining - 1, status));
        }

        let pos = self.faults.iter().position(|fault| fault.matches(op))?;
        Some(self.faults.remove(pos).status)
    }

    fn apply(&mut self, op: &HalOp) {
        match *op {
            HalOp::SetPortGroup { port, group } => self.groups[port.index()] = group,
            HalOp::SetPortState { port, state } => self.states[port.index()] = state,
            HalOp::SetPortDefaultVid { port, vid } => self.default_vids[port.index()] = Some(vid),
            HalOp::AssociatePort { port, vid, .. } => {
                self.vlan_members.entry(vid).or_default().insert(port);
            }
            HalOp::DisassociatePort { port, vid, .. } => {
                if let Some(members) = self.vlan_members.get_mut(&vid) {
                    members.remove(port);
                }
            }
        }
    }
}

/// In-memory switch implementing [`PortControl`].
///
/// Out of reset every port forwards to every other port, like the real chip.
pub struct SimulatedSwitch {
    num_ports: u8,
    state: Mutex<SimState>,
}

impl SimulatedSwitch {
    /// Creates a switch with `num_ports` ports.
    ///
    /// `num_ports` is clamped to [`PortId::CAPACITY`].
    pub fn new(num_ports: u8) -> Self {
        let num_ports = num_ports.min(PortId::CAPACITY);
        let all = (0..num_ports)
            .filter_map(|i| PortId::new(i).ok())
            .collect::<PortSet>();
        let groups = all.iter().map(|port| all.without(port)).collect();

        Self {
            num_ports,
            state: Mutex::new(SimState {
                groups,
                states: vec![PortState::Forwarding; num_ports as usize],
                default_vids: vec![None; num_ports as usize],
                vlan_members: BTreeMap::new(),
                ops: Vec::new(),
                faults: Vec::new(),
                fail_after: None,
            }),
        }
    }

    pub fn num_ports(&self) -> u8 {
        self.num_ports
    }

    /// Makes the next `kind` call (optionally only for `port`) fail with
    /// `status`. Each armed fault fires once.
    pub fn fail_on(&self, kind: HalOpKind, port: Option<PortId>, status: GtStatus) {
        self.state.lock().faults.push(Fault { kind, port, status });
    }

    /// Lets `successes` calls through, then fails the next one with `status`.
    pub fn fail_after(&self, successes: usize, status: GtStatus) {
        self.state.lock().fail_after = Some((successes, status));
    }

    /// Disarms every pending fault.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.faults.clear();
        state.fail_after = None;
    }

    pub fn port_group(&self, port: PortId) -> Option<PortSet> {
        self.state.lock().groups.get(port.index()).copied()
    }

    pub fn port_state(&self, port: PortId) -> Option<PortState> {
        self.state.lock().states.get(port.index()).copied()
    }

    /// Returns the PVID last programmed on `port`, `None` if never set.
    pub fn default_vid(&self, port: PortId) -> Option<VlanId> {
        self.state.lock().default_vids.get(port.index()).copied().flatten()
    }

    /// Ports currently associated with `vid` in the VLAN table.
    pub fn vlan_members(&self, vid: VlanId) -> PortSet {
        self.state
            .lock()
            .vlan_members
            .get(&vid)
            .copied()
            .unwrap_or_default()
    }

    /// Calls accepted so far, oldest first.
    pub fn ops(&self) -> Vec<HalOp> {
        self.state.lock().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    fn execute(&self, op: HalOp) -> HalResult<()> {
        if op.port().as_u8() >= self.num_ports {
            return Err(HalError::invalid_parameter(format!(
                "port {} beyond switch size {}",
                op.port(),
                self.num_ports
            )));
        }

        let mut state = self.state.lock();
        if let Some(status) = state.take_fault(&op) {
            warn!("simulated switch: injected {} on {}", status, op);
            return Err(HalError::from_status(status));
        }

        trace!("simulated switch: {}", op);
        state.apply(&op);
        state.ops.push(op);
        Ok(())
    }
}

impl PortControl for SimulatedSwitch {
    fn set_port_group(&self, port: PortId, group: PortSet) -> HalResult<()> {
        if group.contains(port) {
            return Err(HalError::invalid_parameter(format!(
                "port {} listed in its own group {}",
                port, group
            )));
        }
        self.execute(HalOp::SetPortGroup { port, group })
    }

    fn set_port_state(&self, port: PortId, state: PortState) -> HalResult<()> {
        self.execute(HalOp::SetPortState { port, state })
    }

    fn set_port_default_vid(&self, port: PortId, vid: VlanId) -> HalResult<()> {
        self.execute(HalOp::SetPortDefaultVid { port, vid })
    }

    fn associate_port(
        &self,
        port: PortId,
        vid: VlanId,
        members: PortSet,
        member_count: u8,
    ) -> HalResult<()> {
        self.execute(HalOp::AssociatePort {
            port,
            vid,
            members,
            member_count,
        })
    }

    fn disassociate_port(&self, port: PortId, vid: VlanId, members: PortSet) -> HalResult<()> {
        self.execute(HalOp::DisassociatePort { port, vid, members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(i: u8) -> PortId {
        PortId::new(i).unwrap()
    }

    fn vid(i: u8) -> VlanId {
        VlanId::new(i).unwrap()
    }

    #[test]
    fn test_reset_state() {
        let switch = SimulatedSwitch::new(4);
        assert_eq!(
            switch.port_group(port(0)),
            Some(PortSet::from_ports([port(1), port(2), port(3)]))
        );
        assert_eq!(switch.port_state(port(2)), Some(PortState::Forwarding));
        assert_eq!(switch.default_vid(port(1)), None);
        assert!(switch.ops().is_empty());
    }

    #[test]
    fn test_register_writes_are_applied_and_logged() {
        let switch = SimulatedSwitch::new(6);
        switch.set_port_state(port(1), PortState::Disabled).unwrap();
        switch.set_port_default_vid(port(1), vid(2)).unwrap();
        switch
            .set_port_group(port(1), PortSet::from_ports([port(2), port(5)]))
            .unwrap();

        assert_eq!(switch.port_state(port(1)), Some(PortState::Disabled));
        assert_eq!(switch.default_vid(port(1)), Some(vid(2)));
        assert_eq!(switch.port_group(port(1)).unwrap().len(), 2);
        assert_eq!(switch.ops().len(), 3);

        switch.clear_ops();
        assert!(switch.ops().is_empty());
    }

    #[test]
    fn test_associate_disassociate() {
        let switch = SimulatedSwitch::new(6);
        let members = PortSet::from_ports([port(0), port(1)]);
        switch.associate_port(port(0), vid(2), members, 2).unwrap();
        switch.associate_port(port(1), vid(2), members, 2).unwrap();
        assert_eq!(switch.vlan_members(vid(2)), members);

        switch
            .disassociate_port(port(0), vid(2), PortSet::from_ports([port(1)]))
            .unwrap();
        assert_eq!(switch.vlan_members(vid(2)), PortSet::from_ports([port(1)]));
        assert!(switch.vlan_members(vid(3)).is_empty());
    }

    #[test]
    fn test_rejects_port_beyond_size() {
        let switch = SimulatedSwitch::new(4);
        let err = switch.set_port_state(port(4), PortState::Blocking).unwrap_err();
        assert!(matches!(err, HalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_rejects_self_in_group() {
        let switch = SimulatedSwitch::new(4);
        let err = switch
            .set_port_group(port(1), PortSet::from_ports([port(1)]))
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidParameter { .. }));
    }

    #[test]
    fn test_fail_on_fires_once() {
        let switch = SimulatedSwitch::new(6);
        switch.fail_on(HalOpKind::SetPortState, Some(port(2)), GtStatus::Fail);

        // Other ports are unaffected
        switch.set_port_state(port(1), PortState::Disabled).unwrap();

        let err = switch.set_port_state(port(2), PortState::Disabled).unwrap_err();
        assert_eq!(err.status(), GtStatus::Fail);
        assert_eq!(switch.port_state(port(2)), Some(PortState::Forwarding));

        switch.set_port_state(port(2), PortState::Disabled).unwrap();
        assert_eq!(switch.port_state(port(2)), Some(PortState::Disabled));
    }

    #[test]
    fn test_fail_after() {
        let switch = SimulatedSwitch::new(6);
        switch.fail_after(2, GtStatus::Timeout);

        switch.set_port_default_vid(port(0), vid(1)).unwrap();
        switch.set_port_default_vid(port(1), vid(1)).unwrap();
        assert_eq!(
            switch.set_port_default_vid(port(2), vid(1)).unwrap_err(),
            HalError::Timeout
        );
        switch.set_port_default_vid(port(2), vid(1)).unwrap();
        assert_eq!(switch.ops().len(), 3);
    }

    #[test]
    fn test_clear_faults() {
        let switch = SimulatedSwitch::new(6);
        switch.fail_on(HalOpKind::SetPortGroup, None, GtStatus::Fail);
        switch.fail_after(0, GtStatus::Fail);
        switch.clear_faults();

        assert!(switch.set_port_group(port(0), PortSet::empty()).is_ok());
    }
}
