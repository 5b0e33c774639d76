//! CIDR subnet calculation
//!
//! Provides utilities for working with IPv4 CIDR blocks:
//! - Parse CIDR notation (e.g., "192.168.0.0/24")
//! - Derive mask, network, broadcast and usable host range
//! - Subdivide a block into equal subnets by count or by target prefix
//! - Check if an address is in a block
//!
//! # Examples
//!
//! ```
//! use ipkit_cidr::{SubnetBlock, Subdivision};
//!
//! let block = SubnetBlock::parse("192.168.1.0/24").unwrap();
//! let info = block.descriptor();
//! assert_eq!(info.broadcast.to_string(), "192.168.1.255");
//! assert_eq!(info.host_count, 254);
//!
//! let halves = block.subdivide(Subdivision::ByCount(2)).unwrap();
//! assert_eq!(halves[1].to_string(), "192.168.1.128/25");
//! ```

use ipkit_core::{AddressError, Ipv4Address, Step};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Longest IPv4 prefix
pub const MAX_PREFIX: u8 = 32;

/// Most subnets a single subdivision will materialize
pub const MAX_SUBNETS: u64 = 1 << 16;

/// CIDR errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    /// Malformed CIDR text
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Subdivision by count needs more host bits than the block has
    #[error("Prefix overflow: /{prefix} needs {bits} more bits, exceeding /32")]
    PrefixOverflow { prefix: u8, bits: u32 },

    /// Target prefix is not strictly longer than the block's prefix
    #[error("Invalid prefix: /{target} must be greater than /{current} and at most /32")]
    InvalidPrefix { target: u8, current: u8 },

    /// Subdivision by zero subnets
    #[error("Invalid subnet count: {0}")]
    InvalidCount(u32),

    /// Subdivision would produce too many subnets
    #[error("Subdivision too large: {0} subnets (limit is 65536)")]
    RangeTooLarge(u64),
}

impl From<AddressError> for CidrError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::InvalidFormat(msg) => CidrError::InvalidFormat(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, CidrError>;

/// Network mask for a prefix length (0-32)
pub fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (MAX_PREFIX - prefix_len.min(MAX_PREFIX))
    }
}

/// CIDR block as entered
///
/// Keeps the address the caller supplied; the network address is always
/// derived from it by masking. Deserialization goes through
/// [`SubnetBlock::new`], so an out-of-range prefix is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSubnetBlock")]
pub struct SubnetBlock {
    address: Ipv4Address,
    prefix_len: u8,
}

#[derive(Deserialize)]
struct RawSubnetBlock {
    address: Ipv4Address,
    prefix_len: u8,
}

impl TryFrom<RawSubnetBlock> for SubnetBlock {
    type Error = CidrError;

    fn try_from(raw: RawSubnetBlock) -> Result<Self> {
        Self::new(raw.address, raw.prefix_len)
    }
}

/// Subdivision request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdivision {
    /// At least this many equal subnets, rounded up to a power of two
    ByCount(u32),
    /// Subnets with this prefix length
    ByPrefix(u8),
}

impl SubnetBlock {
    /// Parse CIDR notation string
    ///
    /// # Arguments
    ///
    /// * `text` - CIDR string (e.g., "192.168.1.0/24")
    ///
    /// # Examples
    ///
    /// ```
    /// use ipkit_cidr::SubnetBlock;
    ///
    /// let block = SubnetBlock::parse("10.0.0.0/8").unwrap();
    /// assert_eq!(block.prefix_len(), 8);
    /// assert!(SubnetBlock::parse("10.0.0.0/33").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('/').collect();
        if parts.len() != 2 {
            return Err(CidrError::InvalidFormat(format!(
                "expected x.x.x.x/prefix, got '{}'",
                text
            )));
        }

        let address = Ipv4Address::parse(parts[0])?;
        let prefix_len = Self::parse_prefix(parts[1])?;

        Ok(Self {
            address,
            prefix_len,
        })
    }

    fn parse_prefix(text: &str) -> Result<u8> {
        if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CidrError::InvalidFormat(format!("invalid prefix '{}'", text)));
        }

        let prefix_len: u8 = text
            .parse()
            .map_err(|_| CidrError::InvalidFormat(format!("invalid prefix '{}'", text)))?;

        if prefix_len > MAX_PREFIX {
            return Err(CidrError::InvalidFormat(format!(
                "prefix /{} is out of range 0-32",
                prefix_len
            )));
        }

        Ok(prefix_len)
    }

    /// Create a block from an address and prefix length
    pub fn new(address: Ipv4Address, prefix_len: u8) -> Result<Self> {
        if prefix_len > MAX_PREFIX {
            return Err(CidrError::InvalidFormat(format!(
                "prefix /{} is out of range 0-32",
                prefix_len
            )));
        }

        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// Address as entered
    pub fn address(&self) -> Ipv4Address {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn mask(&self) -> u32 {
        prefix_mask(self.prefix_len)
    }

    pub fn network(&self) -> Ipv4Address {
        Ipv4Address::from_u32(self.address.to_u32() & self.mask())
    }

    pub fn broadcast(&self) -> Ipv4Address {
        Ipv4Address::from_u32(self.network().to_u32() | !self.mask())
    }

    /// Check if an address is in this block
    pub fn contains(&self, addr: Ipv4Address) -> bool {
        (addr.to_u32() & self.mask()) == self.network().to_u32()
    }

    /// Compute network, broadcast and host range
    pub fn descriptor(&self) -> SubnetDescriptor {
        SubnetDescriptor::compute(self.address.to_u32(), self.prefix_len)
    }

    /// Derivation of the descriptor, one step per computed value
    pub fn explain(&self) -> Vec<Step> {
        let mask = Ipv4Address::from_u32(self.mask());
        let inverted = Ipv4Address::from_u32(!self.mask());
        let network = self.network();
        let broadcast = self.broadcast();

        let hosts = match self.prefix_len {
            32 => "/32 is a single address".to_string(),
            31 => "/31 is point-to-point, both addresses usable".to_string(),
            p => format!(
                "2^{} - 2 = {}",
                MAX_PREFIX - p,
                self.descriptor().host_count
            ),
        };

        vec![
            Step::new(
                "Mask",
                format!("/{} -> {} ({})", self.prefix_len, mask.to_binary_text(), mask),
            ),
            Step::new(
                "Network",
                format!(
                    "{} AND {} -> {} ({})",
                    self.address.to_binary_text(),
                    mask.to_binary_text(),
                    network.to_binary_text(),
                    network
                ),
            ),
            Step::new(
                "Broadcast",
                format!(
                    "{} OR {} -> {} ({})",
                    network.to_binary_text(),
                    inverted.to_binary_text(),
                    broadcast.to_binary_text(),
                    broadcast
                ),
            ),
            Step::new("Hosts", hosts),
        ]
    }

    /// Split this block into equal subnets
    ///
    /// Subnets are returned in ascending network order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ipkit_cidr::{SubnetBlock, Subdivision};
    ///
    /// let block = SubnetBlock::parse("192.168.0.0/24").unwrap();
    /// let subnets = block.subdivide(Subdivision::ByPrefix(26)).unwrap();
    /// assert_eq!(subnets.len(), 4);
    ///
    /// // Counts that are not a power of two are rounded up
    /// let subnets = block.subdivide(Subdivision::ByCount(3)).unwrap();
    /// assert_eq!(subnets.len(), 4);
    /// ```
    pub fn subdivide(&self, mode: Subdivision) -> Result<Vec<SubnetDescriptor>> {
        let new_prefix = match mode {
            Subdivision::ByCount(count) => {
                if count == 0 {
                    return Err(CidrError::InvalidCount(count));
                }

                let bits = u64::from(count).next_power_of_two().trailing_zeros();
                if u32::from(self.prefix_len) + bits > u32::from(MAX_PREFIX) {
                    return Err(CidrError::PrefixOverflow {
                        prefix: self.prefix_len,
                        bits,
                    });
                }

                if !count.is_power_of_two() {
                    debug!(
                        requested = count,
                        produced = 1u64 << bits,
                        "subnet count rounded up to a power of two"
                    );
                }

                self.prefix_len + bits as u8
            }
            Subdivision::ByPrefix(target) => {
                if target <= self.prefix_len || target > MAX_PREFIX {
                    return Err(CidrError::InvalidPrefix {
                        target,
                        current: self.prefix_len,
                    });
                }
                target
            }
        };

        let count = 1u64 << (new_prefix - self.prefix_len);
        if count > MAX_SUBNETS {
            return Err(CidrError::RangeTooLarge(count));
        }

        let size = 1u64 << (MAX_PREFIX - new_prefix);
        let base = u64::from(self.network().to_u32());

        debug!(block = %self, new_prefix, count, "subdividing");

        Ok((0..count)
            .map(|i| SubnetDescriptor::compute((base + i * size) as u32, new_prefix))
            .collect())
    }
}

impl fmt::Display for SubnetBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

impl FromStr for SubnetBlock {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Computed view of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetDescriptor {
    pub network: Ipv4Address,
    pub netmask: Ipv4Address,
    pub broadcast: Ipv4Address,
    pub first_host: Ipv4Address,
    pub last_host: Ipv4Address,
    pub host_count: u64,
    pub prefix_len: u8,
}

impl SubnetDescriptor {
    fn compute(address: u32, prefix_len: u8) -> Self {
        let mask = prefix_mask(prefix_len);
        let network = address & mask;
        let broadcast = network | !mask;

        let (first_host, last_host, host_count) = match prefix_len {
            32 => (network, network, 1),
            31 => (network, broadcast, 2),
            _ => (
                network + 1,
                broadcast - 1,
                u64::from(broadcast - network) - 1,
            ),
        };

        Self {
            network: Ipv4Address::from_u32(network),
            netmask: Ipv4Address::from_u32(mask),
            broadcast: Ipv4Address::from_u32(broadcast),
            first_host: Ipv4Address::from_u32(first_host),
            last_host: Ipv4Address::from_u32(last_host),
            host_count,
            prefix_len,
        }
    }
}

impl fmt::Display for SubnetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}
