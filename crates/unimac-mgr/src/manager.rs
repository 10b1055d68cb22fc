//! UnmManager - the UniMAC port/VLAN association manager.
//!
//! Owns the live port-to-VLAN tables and keeps the switch's port-group,
//! forwarding-state and PVID registers in step with them.
//!
//! Hardware flow for a port move:
//! 1. quiesce the port (unless it was DISABLED)
//! 2. disassociate from the old VLAN / associate with the new one
//! 3. rewrite the port group of every member of both VLANs, then the CPU port
//! 4. set the PVID and re-enable forwarding (unless moving to DISABLED)
//!
//! The tables are committed only after the last hardware call succeeds. A
//! failing call aborts the operation and leaves earlier register writes in
//! place: hardware may diverge from the tables until the next successful
//! operation touching those ports.

use parking_lot::{RwLock, RwLockReadGuard};
use qd_hal::{PortControl, PortState};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use unimac_types::{PortId, PortSet, VlanId};

use crate::audit::{AuditCategory, AuditRecord};
use crate::audit_log;
use crate::board::BoardProfile;
use crate::error::{UnmError, UnmResult};
use crate::layout::SwitchLayout;
use crate::netconf::{NetConfig, NetConfigSource};
use crate::state::{UnmSnapshot, UnmTables};

const AUDIT_SOURCE: &str = "UnmManager";

/// The UniMAC manager.
///
/// Shared as `Arc<UnmManager>`. Mutating operations hold the table write lock
/// for their whole duration, hardware calls included, so they are serialized
/// against each other and against queries.
pub struct UnmManager {
    layout: SwitchLayout,
    hal: Arc<dyn PortControl>,
    source: Arc<dyn NetConfigSource>,
    /// Assignment used when `source` has nothing
    fallback: NetConfig,
    tables: RwLock<UnmTables>,
}

impl UnmManager {
    /// Creates an uninitialized manager falling back to the generic board
    /// assignment.
    pub fn new(
        layout: SwitchLayout,
        hal: Arc<dyn PortControl>,
        source: Arc<dyn NetConfigSource>,
    ) -> Self {
        Self {
            layout,
            hal,
            source,
            fallback: BoardProfile::Generic.default_config(),
            tables: RwLock::new(UnmTables::new()),
        }
    }

    /// Replaces the assignment used when the net-config source is empty.
    pub fn with_fallback(mut self, fallback: NetConfig) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn layout(&self) -> &SwitchLayout {
        &self.layout
    }

    // ============ Initialization ============

    /// Builds the tables from the net config and programs the reserved VLANs.
    ///
    /// ISOLATED members get their port groups written and DISABLED members
    /// are put in the `Disabled` forwarding state. A hardware failure aborts
    /// with the manager left uninitialized and earlier writes in place.
    #[instrument(skip(self))]
    pub fn initialize(&self) -> UnmResult<()> {
        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            AUDIT_SOURCE,
            "initialize"
        )
        .with_details(json!({ "layout": self.layout.to_string() })));

        let mut tables = self.tables.write();
        let result = self.initialize_locked(&mut tables);

        audit_log!(AuditRecord::new(
            AuditCategory::SystemLifecycle,
            AUDIT_SOURCE,
            "initialize"
        )
        .with_details(json!({
            "number_of_vids": tables.number_of_vids(),
            "cpu_port_mask": tables.cpu_port_mask().to_string(),
        }))
        .with_result(&result));

        result
    }

    fn initialize_locked(&self, tables: &mut UnmTables) -> UnmResult<()> {
        let config = match self.source.net_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("Net config unavailable, using board default: {}", e);
                self.fallback.clone()
            }
        };

        *tables = self.build_tables(&config)?;

        let isolated = tables.members(VlanId::ISOLATED);
        if !isolated.is_empty() {
            self.program_vlan(tables, VlanId::ISOLATED, isolated)?;
        }

        let disabled = tables.members(VlanId::DISABLED);
        for port in disabled.iter() {
            self.set_port_state(port, PortState::Disabled)?;
        }

        tables.initialized = true;
        info!(
            "UniMAC manager initialized: {} user VLANs, {} isolated, {} disabled",
            tables.number_of_vids(),
            isolated.len(),
            disabled.len()
        );
        Ok(())
    }

    fn build_tables(&self, config: &NetConfig) -> UnmResult<UnmTables> {
        config.validate(&self.layout)?;

        let mut tables = UnmTables::new();
        for port in self.layout.user_ports() {
            let vid = config.vid_of(port).unwrap_or_else(|| {
                debug!("Port {} missing from net config, disabling", port);
                VlanId::DISABLED
            });
            tables.assign(port, vid);
        }
        Ok(tables)
    }

    /// Materialises the port groups of every configured user VLAN, in
    /// ascending VLAN order. Stops at the first failure.
    #[instrument(skip(self))]
    pub fn sync_vlans(&self) -> UnmResult<()> {
        let tables = self.tables.write();
        if !tables.is_initialized() {
            return Err(UnmError::NotInitialized);
        }

        let vids: Vec<VlanId> = VlanId::user_vids()
            .filter(|vid| tables.is_initiated(*vid) && !tables.members(*vid).is_empty())
            .collect();
        for vid in &vids {
            let members = tables.members(*vid);
            let result = self.program_vlan(&tables, *vid, members);
            Self::audit_create_vlan(*vid, members, &result);
            result?;
        }

        info!("Synchronised {} VLANs", vids.len());
        Ok(())
    }

    // ============ Queries ============

    /// Returns the VLAN of every user port.
    pub fn net_config(&self) -> UnmResult<BTreeMap<PortId, VlanId>> {
        let tables = self.read_initialized()?;
        Ok(self
            .layout
            .user_ports()
            .map(|port| (port, tables.vid_of(port)))
            .collect())
    }

    /// Member ports of `vid`, CPU port excluded.
    pub fn port_mask_of_vid(&self, vid: VlanId) -> UnmResult<PortSet> {
        Ok(self.read_initialized()?.members(vid))
    }

    pub fn vid_of_port(&self, port: PortId) -> UnmResult<VlanId> {
        let tables = self.read_initialized()?;
        self.layout.check_user_port(port)?;
        Ok(tables.vid_of(port))
    }

    /// Number of initiated user VLANs.
    pub fn num_of_vlans(&self) -> UnmResult<u8> {
        Ok(self.read_initialized()?.number_of_vids())
    }

    pub fn num_ports_of_vid(&self, vid: VlanId) -> UnmResult<u8> {
        Ok(self.read_initialized()?.member_count(vid))
    }

    /// The CPU port's group: every member of an active VLAN.
    pub fn cpu_port_mask(&self) -> UnmResult<PortSet> {
        Ok(self.read_initialized()?.cpu_port_mask())
    }

    pub fn is_vlan_initiated(&self, vid: VlanId) -> UnmResult<bool> {
        Ok(self.read_initialized()?.is_initiated(vid))
    }

    pub fn is_initialized(&self) -> bool {
        self.tables.read().is_initialized()
    }

    pub fn snapshot(&self) -> UnmResult<UnmSnapshot> {
        Ok(self.read_initialized()?.snapshot(&self.layout))
    }

    fn read_initialized(&self) -> UnmResult<RwLockReadGuard<'_, UnmTables>> {
        let tables = self.tables.read();
        if !tables.is_initialized() {
            return Err(UnmError::NotInitialized);
        }
        Ok(tables)
    }

    // ============ Port move ============

    /// Moves `port` into `new_vid`.
    ///
    /// Moving a port into the VLAN it already belongs to is a no-op. The
    /// target VLAN must already be initiated.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` before [`initialize`](Self::initialize) completes
    /// - `BadParam` for the CPU port or a port beyond the switch
    /// - `VlanNotCreated` if `new_vid` was never initiated
    /// - `HardwareFailure` if a register write fails; writes already made by
    ///   this call are not undone and the tables keep their previous values
    #[instrument(skip(self))]
    pub fn move_port(&self, port: PortId, new_vid: VlanId) -> UnmResult<()> {
        let mut tables = self.tables.write();
        let old_vid = tables.vid_of(port);
        let result = self.move_port_locked(&mut tables, port, new_vid);

        audit_log!(AuditRecord::new(
            AuditCategory::ResourceModify,
            AUDIT_SOURCE,
            "move_port"
        )
        .with_object_id(format!("port{}", port))
        .with_object_type("switch_port")
        .with_details(json!({
            "old_vid": old_vid.as_u8(),
            "new_vid": new_vid.as_u8(),
        }))
        .with_result(&result));

        result
    }

    /// [`move_port`](Self::move_port) taking raw integers, as handed in by
    /// the ioctl layer.
    pub fn move_port_raw(&self, port: u8, vid: u8) -> UnmResult<()> {
        if !self.is_initialized() {
            return Err(UnmError::NotInitialized);
        }
        let port = self.layout.user_port(port)?;
        let vid = VlanId::new(vid).map_err(|e| UnmError::bad_param("vid", e.to_string()))?;
        self.move_port(port, vid)
    }

    fn move_port_locked(&self, tables: &mut UnmTables, port: PortId, new_vid: VlanId) -> UnmResult<()> {
        if !tables.is_initialized() {
            return Err(UnmError::NotInitialized);
        }
        self.layout.check_user_port(port)?;

        let old_vid = tables.vid_of(port);
        if old_vid == new_vid {
            debug!("Port {} already in VLAN {}", port, new_vid);
            return Ok(());
        }
        if !tables.is_initiated(new_vid) {
            return Err(UnmError::VlanNotCreated { vid: new_vid });
        }

        if !old_vid.is_disabled() {
            self.set_port_state(port, PortState::Disabled)?;
        }

        let mut cpu_port_mask = tables.cpu_port_mask();

        let old_members = tables.members(old_vid).without(port);
        if old_vid.is_active() {
            self.hal
                .disassociate_port(port, old_vid, old_members)
                .map_err(|e| UnmError::hardware("disassociate_port", port, e))?;
            cpu_port_mask.remove(port);
        }

        let new_members = tables.members(new_vid).with(port);
        if new_vid.is_active() {
            self.hal
                .associate_port(port, new_vid, new_members, new_members.len())
                .map_err(|e| UnmError::hardware("associate_port", port, e))?;
            cpu_port_mask.insert(port);
        }

        // Old and new member sets are disjoint
        for member in old_members.union(new_members).iter() {
            let (vid, members) = if new_members.contains(member) {
                (new_vid, new_members)
            } else {
                (old_vid, old_members)
            };
            self.set_port_group(member, UnmTables::hw_group(&self.layout, member, vid, members))?;
        }
        self.set_port_group(self.layout.cpu_port(), cpu_port_mask)?;

        self.hal
            .set_port_default_vid(port, new_vid)
            .map_err(|e| UnmError::hardware("set_port_default_vid", port, e))?;

        if !new_vid.is_disabled() {
            self.set_port_state(port, PortState::Forwarding)?;
        }

        tables.ports_of_vid[old_vid.index()] = old_members;
        tables.num_ports_of_vid[old_vid.index()] = old_members.len();
        tables.ports_of_vid[new_vid.index()] = new_members;
        tables.num_ports_of_vid[new_vid.index()] = new_members.len();
        tables.vid_of_port[port.index()] = new_vid;
        tables.cpu_port_mask = cpu_port_mask;

        info!("Moved port {} from VLAN {} to VLAN {}", port, old_vid, new_vid);
        Ok(())
    }

    // ============ VLAN create ============

    /// Rewrites the port group of every switch port for `vid` with
    /// `member_mask` as its membership.
    ///
    /// Ports in `member_mask` get `vid` as PVID. The tables are not touched:
    /// membership bookkeeping belongs to [`move_port`](Self::move_port) and
    /// [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// - `NotInitialized` before initialization completes
    /// - `BadParam` for the DISABLED VLAN or a mask naming the CPU port or a
    ///   port beyond the switch
    /// - `VlanNotCreated` if `vid` was never initiated
    /// - `HardwareFailure` if a register write fails; ports already
    ///   reprogrammed by this call stay reprogrammed
    #[instrument(skip(self))]
    pub fn create_vlan(&self, vid: VlanId, member_mask: PortSet) -> UnmResult<()> {
        let tables = self.tables.write();
        let result = self.create_vlan_locked(&tables, vid, member_mask);
        Self::audit_create_vlan(vid, member_mask, &result);
        result
    }

    /// [`create_vlan`](Self::create_vlan) taking a raw id and register mask.
    pub fn create_vlan_raw(&self, vid: u8, member_mask: u16) -> UnmResult<()> {
        if !self.is_initialized() {
            return Err(UnmError::NotInitialized);
        }
        let vid = VlanId::new(vid).map_err(|e| UnmError::bad_param("vid", e.to_string()))?;
        let member_mask = PortSet::from_bits(member_mask)
            .map_err(|e| UnmError::bad_param("member_mask", e.to_string()))?;
        self.create_vlan(vid, member_mask)
    }

    fn create_vlan_locked(&self, tables: &UnmTables, vid: VlanId, member_mask: PortSet) -> UnmResult<()> {
        if !tables.is_initialized() {
            return Err(UnmError::NotInitialized);
        }
        if vid.is_disabled() {
            return Err(UnmError::bad_param("vid", "the DISABLED VLAN cannot be created"));
        }
        for port in member_mask.iter() {
            self.layout.check_user_port(port)?;
        }
        if !tables.is_initiated(vid) {
            return Err(UnmError::VlanNotCreated { vid });
        }

        self.program_vlan(tables, vid, member_mask)?;
        info!("Created VLAN {} with members {}", vid, member_mask);
        Ok(())
    }

    /// Writes the port group of every port for `vid` with `member_mask`.
    /// Shared by VLAN create and initialization.
    fn program_vlan(&self, tables: &UnmTables, vid: VlanId, member_mask: PortSet) -> UnmResult<()> {
        for port in self.layout.ports() {
            let group = if self.layout.is_cpu(port) {
                tables.cpu_port_mask()
            } else if member_mask.contains(port) {
                self.hal
                    .set_port_default_vid(port, vid)
                    .map_err(|e| UnmError::hardware("set_port_default_vid", port, e))?;
                UnmTables::hw_group(&self.layout, port, vid, member_mask)
            } else {
                let other = tables.vid_of(port);
                UnmTables::hw_group(&self.layout, port, other, tables.members(other))
            };
            self.set_port_group(port, group)?;
        }
        Ok(())
    }

    fn audit_create_vlan(vid: VlanId, member_mask: PortSet, result: &UnmResult<()>) {
        audit_log!(AuditRecord::new(
            AuditCategory::ResourceCreate,
            AUDIT_SOURCE,
            "create_vlan"
        )
        .with_object_id(format!("vlan{}", vid))
        .with_object_type("vlan")
        .with_details(json!({ "members": member_mask.to_string() }))
        .with_result(result));
    }

    // ============ Hardware helpers ============

    fn set_port_group(&self, port: PortId, group: PortSet) -> UnmResult<()> {
        debug!("Port {} group {}", port, group);
        self.hal
            .set_port_group(port, group)
            .map_err(|e| UnmError::hardware("set_port_group", port, e))
    }

    fn set_port_state(&self, port: PortId, state: PortState) -> UnmResult<()> {
        debug!("Port {} state {}", port, state);
        self.hal
            .set_port_state(port, state)
            .map_err(|e| UnmError::hardware("set_port_state", port, e))
    }
}
