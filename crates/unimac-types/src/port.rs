//! Switch port index and the port-set (hardware port mask) type.

use crate::{ParseError, MAX_SWITCH_PORTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical switch port index.
///
/// The upper bound depends on the board layout, so only the absolute
/// capacity (`MAX_SWITCH_PORTS`, plus one slot for the CPU port) is
/// enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PortId(u8);

impl PortId {
    /// Number of port slots a [`PortSet`] can hold.
    pub const CAPACITY: u8 = MAX_SWITCH_PORTS + 1;

    /// Creates a new port id.
    ///
    /// # Errors
    ///
    /// Returns an error if the index does not fit in a [`PortSet`].
    pub const fn new(index: u8) -> Result<Self, ParseError> {
        if index < Self::CAPACITY {
            Ok(PortId(index))
        } else {
            Err(ParseError::PortOutOfRange(index as u16))
        }
    }

    /// Const-context form of [`PortId::new`].
    pub const fn checked(index: u8) -> Option<Self> {
        if index < Self::CAPACITY {
            Some(PortId(index))
        } else {
            None
        }
    }

    /// Returns the port index.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns the port index as a table index.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    const fn bit(&self) -> u16 {
        1 << self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        let id_str = lower.strip_prefix("port").unwrap_or(&lower);
        let index: u16 = id_str
            .parse()
            .map_err(|_| ParseError::InvalidPort(trimmed.to_string()))?;
        let index = u8::try_from(index).map_err(|_| ParseError::PortOutOfRange(index))?;

        PortId::new(index)
    }
}

impl TryFrom<u8> for PortId {
    type Error = ParseError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        PortId::new(index)
    }
}

impl From<PortId> for u8 {
    fn from(port: PortId) -> u8 {
        port.0
    }
}

/// Set of switch ports, stored as the bitmask the switch registers use.
///
/// Bit `n` stands for port `n`. Every operation is checked against
/// [`PortId::CAPACITY`], so shifting past the register width cannot happen.
///
/// # Examples
///
/// ```
/// use unimac_types::{PortId, PortSet};
///
/// let p0 = PortId::new(0).unwrap();
/// let p3 = PortId::new(3).unwrap();
///
/// let set = PortSet::from_ports([p0, p3]);
/// assert!(set.contains(p3));
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.without(p0).bits(), 0b1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<PortId>", into = "Vec<PortId>")]
pub struct PortSet(u16);

impl PortSet {
    const VALID_BITS: u16 = (1 << PortId::CAPACITY) - 1;

    /// The empty set.
    pub const fn empty() -> Self {
        PortSet(0)
    }

    /// Builds a set from raw register bits.
    ///
    /// # Errors
    ///
    /// Returns an error if a bit beyond the port capacity is set.
    pub const fn from_bits(bits: u16) -> Result<Self, ParseError> {
        if bits & !Self::VALID_BITS == 0 {
            Ok(PortSet(bits))
        } else {
            Err(ParseError::PortOutOfRange(
                (16 - bits.leading_zeros() - 1) as u16,
            ))
        }
    }

    pub fn from_ports<I: IntoIterator<Item = PortId>>(ports: I) -> Self {
        ports.into_iter().fold(Self::empty(), |set, port| set.with(port))
    }

    /// Returns the raw register bits.
    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn contains(&self, port: PortId) -> bool {
        self.0 & port.bit() != 0
    }

    /// Adds a port. Returns true if it was not already present.
    pub fn insert(&mut self, port: PortId) -> bool {
        let absent = !self.contains(port);
        self.0 |= port.bit();
        absent
    }

    /// Removes a port. Returns true if it was present.
    pub fn remove(&mut self, port: PortId) -> bool {
        let present = self.contains(port);
        self.0 &= !port.bit();
        present
    }

    #[must_use]
    pub const fn with(self, port: PortId) -> Self {
        PortSet(self.0 | port.bit())
    }

    #[must_use]
    pub const fn without(self, port: PortId) -> Self {
        PortSet(self.0 & !port.bit())
    }

    #[must_use]
    pub const fn union(self, other: PortSet) -> Self {
        PortSet(self.0 | other.0)
    }

    /// Number of ports in the set.
    pub const fn len(&self) -> u8 {
        self.0.count_ones() as u8
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the member ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PortId> + '_ {
        (0..PortId::CAPACITY)
            .map(PortId)
            .filter(move |port| self.contains(*port))
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, port) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", port)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<PortId> for PortSet {
    fn from_iter<I: IntoIterator<Item = PortId>>(iter: I) -> Self {
        PortSet::from_ports(iter)
    }
}

impl TryFrom<Vec<PortId>> for PortSet {
    type Error = ParseError;

    fn try_from(ports: Vec<PortId>) -> Result<Self, Self::Error> {
        Ok(PortSet::from_ports(ports))
    }
}

impl From<PortSet> for Vec<PortId> {
    fn from(set: PortSet) -> Vec<PortId> {
        set.iter().collect()
    }
}

impl FromStr for PortSet {
    type Err = ParseError;

    /// Parses a comma separated port list such as `"1,2,4"` or `"{1,2,4}"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('{').trim_end_matches('}');
        inner
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<PortId>)
            .collect::<Result<PortSet, _>>()
    }
}
