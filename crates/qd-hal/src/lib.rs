//! Port-control facade for QuarterDeck (88E6xxx family) switch chips.
//!
//! The UniMAC manager never touches switch registers directly. It drives the
//! chip through the [`PortControl`] trait, which exposes the handful of
//! operations the manager needs:
//!
//! - port-based VLAN membership ("port group") of a port
//! - spanning-tree forwarding state of a port
//! - default VLAN id (PVID) of a port
//! - associate/disassociate a port with a VLAN (VLAN table and ATU cleanup)
//!
//! # Modules
//!
//! - [`error`]: QuarterDeck status codes ([`GtStatus`]) and [`HalError`]
//! - [`control`]: the [`PortControl`] trait and [`PortState`]
//! - [`sim`]: [`SimulatedSwitch`], an in-memory backend with fault injection
//!
//! # Example
//!
//! ```
//! use qd_hal::{PortControl, PortState, SimulatedSwitch};
//! use unimac_types::PortId;
//!
//! let switch = SimulatedSwitch::new(6);
//! let port = PortId::new(2).unwrap();
//! switch.set_port_state(port, PortState::Forwarding).unwrap();
//! assert_eq!(switch.port_state(port), Some(PortState::Forwarding));
//! ```

pub mod control;
pub mod error;
pub mod sim;

pub use control::{HalOp, HalOpKind, PortControl, PortState};
pub use error::{GtStatus, HalError, HalResult};
pub use sim::SimulatedSwitch;
