//! Interface MAC of a user VLAN, as carried in the `netconfig=` boot string.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address.
///
/// Parses colon or hyphen separated octets; boot strings often drop the
/// leading zero of an octet, so one or two hex digits are accepted.
///
/// ```
/// use unimac_types::MacAddress;
///
/// let mac: MacAddress = "0:50:43:1:2:3".parse().unwrap();
/// assert_eq!(mac.to_string(), "00:50:43:01:02:03");
/// assert!(!mac.is_multicast());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Group bit of the first octet.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|octet| *octet == 0)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", octet)?;
        }
        Ok(())
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());

        let mut parts = s.trim().split([':', '-']);
        let mut octets = [0u8; 6];
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|part| (1..=2).contains(&part.len()))
                .ok_or_else(invalid)?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(MacAddress(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> String {
        mac.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_separators() {
        let colon: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        assert_eq!(colon.octets(), [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!("00-11-22-33-44-55".parse::<MacAddress>().unwrap(), colon);
        assert_eq!(colon.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn test_parse_short_octets() {
        let mac: MacAddress = "0:50:43:1:2:3".parse().unwrap();
        assert_eq!(mac.to_string(), "00:50:43:01:02:03");
    }

    #[test]
    fn test_unicast_checks() {
        assert!("01:00:5e:00:00:01".parse::<MacAddress>().unwrap().is_multicast());
        assert!(MacAddress::new([0; 6]).is_zero());
        let host = MacAddress::new([0, 0x50, 0x43, 0, 0, 1]);
        assert!(!host.is_zero());
        assert!(!host.is_multicast());
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"00:11:22:33:44:55\"");
        assert!(serde_json::from_str::<MacAddress>("\"00:11:22\"").is_err());
    }

    #[test]
    fn test_invalid_format() {
        for bad in [
            "invalid",
            "00:11:22:33:44",
            "00:11:22:33:44:55:66",
            "gg:11:22:33:44:55",
            "000:11:22:33:44:55",
            "00::22:33:44:55",
        ] {
            assert!(bad.parse::<MacAddress>().is_err(), "{}", bad);
        }
    }
}
