//! Core types for IPKit (IP address toolkit)
//!
//! This crate provides the foundational types used throughout the IPKit workspace:
//! - [`Ipv4Address`] - IPv4 address with strict dotted-decimal parsing
//! - [`Step`] - One line of a derived explanation trace
//! - [`AddressError`] - Error types
//! - [`config`] - Lookup configuration read from the environment
//!
//! ```
//! use ipkit_core::Ipv4Address;
//!
//! let addr = Ipv4Address::parse("192.168.1.1").unwrap();
//! assert_eq!(addr.to_u32(), 0xC0A80101);
//! assert_eq!(addr.to_hex_text(), "C0:A8:01:01");
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

pub mod config;

/// Error types for address parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Malformed dotted-decimal text
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for address operations
pub type Result<T> = std::result::Result<T, AddressError>;

/// IPv4 address
///
/// Four octets stored as one big-endian `u32`. The canonical text form is
/// exactly four dot-separated decimal octets without leading zeros.
///
/// # Examples
///
/// ```
/// use ipkit_core::Ipv4Address;
///
/// let addr = Ipv4Address::from_u32(0x08080808);
/// assert_eq!(addr.to_string(), "8.8.8.8");
/// assert_eq!(addr.octets(), [8, 8, 8, 8]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv4Address(u32);

impl Ipv4Address {
    /// Parse dotted-decimal text
    ///
    /// Accepts exactly four groups, each 1-3 decimal digits with a value of
    /// 0-255. A group with a redundant leading zero (`01`) is rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use ipkit_core::Ipv4Address;
    ///
    /// assert!(Ipv4Address::parse("10.0.0.1").is_ok());
    /// assert!(Ipv4Address::parse("10.0.0.01").is_err());
    /// assert!(Ipv4Address::parse("10.0.0").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let groups: Vec<&str> = text.split('.').collect();
        if groups.len() != 4 {
            return Err(AddressError::InvalidFormat(format!(
                "expected 4 octets in '{}', found {}",
                text,
                groups.len()
            )));
        }

        let mut octets = [0u8; 4];
        for (i, group) in groups.iter().enumerate() {
            octets[i] = Self::parse_octet(group)?;
        }

        Ok(Self::from(octets))
    }

    fn parse_octet(group: &str) -> Result<u8> {
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::InvalidFormat(format!(
                "octet '{}' is not a decimal number",
                group
            )));
        }

        if group.len() > 1 && group.starts_with('0') {
            return Err(AddressError::InvalidFormat(format!(
                "octet '{}' has a leading zero",
                group
            )));
        }

        group.parse().map_err(|_| {
            AddressError::InvalidFormat(format!("octet '{}' is out of range 0-255", group))
        })
    }

    /// Build an address from its integer value
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Integer value: `a*2^24 + b*2^16 + c*2^8 + d`
    pub const fn to_u32(self) -> u32 {
        self.0
    }

    /// The four octets, most significant first
    pub const fn octets(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Each octet as 8 zero-padded binary digits, dot-joined
    ///
    /// ```
    /// use ipkit_core::Ipv4Address;
    ///
    /// let addr = Ipv4Address::parse("192.168.1.1").unwrap();
    /// assert_eq!(addr.to_binary_text(), "11000000.10101000.00000001.00000001");
    /// ```
    pub fn to_binary_text(self) -> String {
        self.octets()
            .iter()
            .map(|o| format!("{:08b}", o))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Each octet as 2 uppercase hex digits, colon-joined
    pub fn to_hex_text(self) -> String {
        self.octets()
            .iter()
            .map(|o| format!("{:02X}", o))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Integer value with `,` thousands separators
    ///
    /// ```
    /// use ipkit_core::Ipv4Address;
    ///
    /// let addr = Ipv4Address::parse("192.168.1.1").unwrap();
    /// assert_eq!(addr.to_decimal_text(), "3,232,235,777");
    /// ```
    pub fn to_decimal_text(self) -> String {
        format_thousands(u64::from(self.0))
    }
}

/// Format an integer with `,` between each group of three digits
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

impl FromStr for Ipv4Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u32> for Ipv4Address {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Ipv4Address> for u32 {
    fn from(addr: Ipv4Address) -> Self {
        addr.0
    }
}

impl From<[u8; 4]> for Ipv4Address {
    fn from(octets: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(octets))
    }
}

impl From<Ipv4Addr> for Ipv4Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self(u32::from(addr))
    }
}

impl From<Ipv4Address> for Ipv4Addr {
    fn from(addr: Ipv4Address) -> Self {
        Ipv4Addr::from(addr.0)
    }
}

impl Serialize for Ipv4Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

/// One line of an explanation trace
///
/// Explanations are returned next to the value they explain, so callers can
/// render them or drop them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Short label for the rule or conversion
    pub title: String,
    /// What was computed
    pub detail: String,
}

impl Step {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.detail)
    }
}
