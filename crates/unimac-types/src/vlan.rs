//! UniMAC VLAN id with the reserved DISABLED/ISOLATED values.

use crate::{ParseError, MAX_SWITCH_PORTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// UniMAC VLAN identifier in `[0, MAX_VID)`.
///
/// Two values are reserved and always exist:
/// - [`VlanId::DISABLED`] (0): ports are administratively shut down.
/// - [`VlanId::ISOLATED`] (`MAX_SWITCH_PORTS + 1`): ports reach nothing but
///   their own group, never the CPU port.
///
/// Every other id is a user VLAN ("active" VLAN).
///
/// # Examples
///
/// ```
/// use unimac_types::VlanId;
///
/// let vid = VlanId::new(2).unwrap();
/// assert!(vid.is_active());
/// assert!(VlanId::DISABLED.is_reserved());
///
/// // Out-of-range ids are rejected
/// assert!(VlanId::new(VlanId::MAX_VID).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct VlanId(u8);

impl VlanId {
    /// Ports assigned here are shut down.
    pub const DISABLED: VlanId = VlanId(0);

    /// Ports assigned here are isolated from the CPU port.
    pub const ISOLATED: VlanId = VlanId(MAX_SWITCH_PORTS + 1);

    /// Size of the VLAN id space.
    pub const MAX_VID: u8 = MAX_SWITCH_PORTS + 2;

    /// Creates a new VLAN id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not below [`VlanId::MAX_VID`].
    pub const fn new(id: u8) -> Result<Self, ParseError> {
        if id < Self::MAX_VID {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id as u16))
        }
    }

    /// Const-context form of [`VlanId::new`].
    pub const fn checked(id: u8) -> Option<Self> {
        if id < Self::MAX_VID {
            Some(VlanId(id))
        } else {
            None
        }
    }

    /// Returns the VLAN id as a u8.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns the id as a table index.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    pub const fn is_disabled(&self) -> bool {
        self.0 == Self::DISABLED.0
    }

    pub const fn is_isolated(&self) -> bool {
        self.0 == Self::ISOLATED.0
    }

    /// Returns true for DISABLED and ISOLATED.
    pub const fn is_reserved(&self) -> bool {
        self.is_disabled() || self.is_isolated()
    }

    /// Returns true for user VLANs, the ones that keep a path to the CPU port.
    pub const fn is_active(&self) -> bool {
        !self.is_reserved()
    }

    /// Iterates over every id in the space, DISABLED first.
    pub fn all() -> impl Iterator<Item = VlanId> {
        (0..Self::MAX_VID).map(VlanId)
    }

    /// Iterates over the user VLAN ids only.
    pub fn user_vids() -> impl Iterator<Item = VlanId> {
        Self::all().filter(VlanId::is_active)
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "disabled" => return Ok(VlanId::DISABLED),
            "isolated" => return Ok(VlanId::ISOLATED),
            _ => {}
        }

        // Handle "vlan3" format
        let id_str = lower.strip_prefix("vlan").unwrap_or(&lower);
        let id: u16 = id_str
            .parse()
            .map_err(|_| ParseError::InvalidVlanId(u16::MAX))?;
        let id = u8::try_from(id).map_err(|_| ParseError::InvalidVlanId(id))?;

        VlanId::new(id)
    }
}

impl TryFrom<u8> for VlanId {
    type Error = ParseError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u8 {
    fn from(vid: VlanId) -> u8 {
        vid.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_ids() {
        assert_eq!(VlanId::DISABLED.as_u8(), 0);
        assert_eq!(VlanId::ISOLATED.as_u8(), MAX_SWITCH_PORTS + 1);
        assert_eq!(VlanId::MAX_VID, VlanId::ISOLATED.as_u8() + 1);
        assert!(VlanId::DISABLED.is_reserved());
        assert!(VlanId::ISOLATED.is_reserved());
        assert!(!VlanId::ISOLATED.is_active());
    }

    #[test]
    fn test_valid_and_invalid_ids() {
        assert!(VlanId::new(0).is_ok());
        assert!(VlanId::new(VlanId::MAX_VID - 1).is_ok());
        assert!(VlanId::new(VlanId::MAX_VID).is_err());
        assert!(VlanId::new(255).is_err());
        assert_eq!(VlanId::checked(11), Some(VlanId::ISOLATED));
        assert_eq!(VlanId::checked(VlanId::MAX_VID), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("3".parse::<VlanId>().unwrap().as_u8(), 3);
        assert_eq!("Vlan2".parse::<VlanId>().unwrap().as_u8(), 2);
        assert_eq!("disabled".parse::<VlanId>().unwrap(), VlanId::DISABLED);
        assert_eq!("ISOLATED".parse::<VlanId>().unwrap(), VlanId::ISOLATED);
        assert!("300".parse::<VlanId>().is_err());
        assert!("vlan".parse::<VlanId>().is_err());
    }

    #[test]
    fn test_user_vids_skip_reserved() {
        let user: Vec<u8> = VlanId::user_vids().map(|v| v.as_u8()).collect();
        assert_eq!(user.len(), VlanId::MAX_VID as usize - 2);
        assert!(!user.contains(&0));
        assert!(!user.contains(&VlanId::ISOLATED.as_u8()));
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let err = VlanId::try_from(VlanId::MAX_VID).unwrap_err();
        assert_eq!(err, ParseError::InvalidVlanId(VlanId::MAX_VID as u16));
    }
}
