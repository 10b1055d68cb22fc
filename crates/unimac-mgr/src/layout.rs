//! Physical switch layout: port count and the CPU port.

use crate::error::{UnmError, UnmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use unimac_types::PortId;

/// Port count and CPU port of a switch.
///
/// This is the only place that knows which port is wired to the host. Every
/// membership and group computation asks it through [`SwitchLayout::is_cpu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchLayout {
    num_ports: u8,
    cpu_port: PortId,
}

impl SwitchLayout {
    /// Creates a layout.
    ///
    /// # Errors
    ///
    /// Returns `BadParam` if `num_ports` exceeds the port capacity, or if the
    /// CPU port is not one of the switch's ports.
    pub fn new(num_ports: u8, cpu_port: u8) -> UnmResult<Self> {
        if num_ports == 0 || num_ports > PortId::CAPACITY {
            return Err(UnmError::bad_param(
                "num_ports",
                format!("{} not in 1..={}", num_ports, PortId::CAPACITY),
            ));
        }
        if cpu_port >= num_ports {
            return Err(UnmError::bad_param(
                "cpu_port",
                format!("{} beyond switch size {}", cpu_port, num_ports),
            ));
        }
        let cpu_port =
            PortId::new(cpu_port).map_err(|e| UnmError::bad_param("cpu_port", e.to_string()))?;

        Ok(Self {
            num_ports,
            cpu_port,
        })
    }

    /// Builds a layout from values already known to be in range.
    pub(crate) const fn from_parts(num_ports: u8, cpu_port: PortId) -> Self {
        Self {
            num_ports,
            cpu_port,
        }
    }

    pub fn num_ports(&self) -> u8 {
        self.num_ports
    }

    pub fn cpu_port(&self) -> PortId {
        self.cpu_port
    }

    pub fn is_cpu(&self, port: PortId) -> bool {
        port == self.cpu_port
    }

    /// Returns true if `port` exists on this switch.
    pub fn contains(&self, port: PortId) -> bool {
        port.as_u8() < self.num_ports
    }

    /// Every port of the switch, CPU port included, ascending.
    pub fn ports(&self) -> impl Iterator<Item = PortId> {
        (0..self.num_ports).filter_map(|i| PortId::new(i).ok())
    }

    /// Every port except the CPU port, ascending.
    pub fn user_ports(&self) -> impl Iterator<Item = PortId> {
        let cpu = self.cpu_port;
        self.ports().filter(move |port| *port != cpu)
    }

    /// Resolves a raw port index to a user port.
    pub fn user_port(&self, index: u8) -> UnmResult<PortId> {
        let port = PortId::new(index).map_err(|e| UnmError::bad_param("port", e.to_string()))?;
        self.check_user_port(port)?;
        Ok(port)
    }

    /// Fails `BadParam` if `port` is the CPU port or not on this switch.
    pub fn check_user_port(&self, port: PortId) -> UnmResult<()> {
        if !self.contains(port) {
            return Err(UnmError::bad_param(
                "port",
                format!("port {} beyond switch size {}", port, self.num_ports),
            ));
        }
        if self.is_cpu(port) {
            return Err(UnmError::bad_param(
                "port",
                format!("port {} is the CPU port", port),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for SwitchLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ports, cpu port {}", self.num_ports, self.cpu_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(i: u8) -> PortId {
        PortId::new(i).unwrap()
    }

    #[test]
    fn test_new_validates_bounds() {
        assert!(SwitchLayout::new(6, 5).is_ok());
        assert!(SwitchLayout::new(11, 10).is_ok());
        assert!(SwitchLayout::new(12, 5).unwrap_err().is_bad_param());
        assert!(SwitchLayout::new(0, 0).unwrap_err().is_bad_param());
        assert!(SwitchLayout::new(6, 6).unwrap_err().is_bad_param());
    }

    #[test]
    fn test_user_ports_skip_cpu() {
        let layout = SwitchLayout::new(7, 3).unwrap();
        let ports: Vec<u8> = layout.user_ports().map(|p| p.as_u8()).collect();
        assert_eq!(ports, vec![0, 1, 2, 4, 5, 6]);
        assert!(layout.is_cpu(port(3)));
    }

    #[test]
    fn test_check_user_port() {
        let layout = SwitchLayout::new(6, 5).unwrap();
        assert!(layout.check_user_port(port(0)).is_ok());
        assert!(layout.check_user_port(port(5)).unwrap_err().is_bad_param());
        assert!(layout.check_user_port(port(6)).unwrap_err().is_bad_param());
        assert!(layout.user_port(42).unwrap_err().is_bad_param());
        assert_eq!(layout.user_port(4).unwrap(), port(4));
    }

    #[test]
    fn test_display() {
        let layout = SwitchLayout::new(6, 5).unwrap();
        assert_eq!(layout.to_string(), "6 ports, cpu port 5");
    }
}
