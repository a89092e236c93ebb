//! IPv4 address and CIDR notation utilities.
//!
//! Provides [`Ipv4`] struct for representing CIDR blocks, along with the
//! integer arithmetic used by the store, the hierarchy builder and the
//! allocation engine. Addresses are widened to `u64` so that the address
//! one past `255.255.255.255` is representable.

use crate::error::{IpamError, IpamResult};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Subnet mask of prefix length `len` as u32; lengths past 32 saturate.
fn mask_bits(len: u8) -> u32 {
    let right_len = MAX_LENGTH - len.min(MAX_LENGTH);
    ((u32::MAX as u64 >> right_len) << right_len) as u32
}

/// Number of addresses in a block of prefix length `len`.
pub fn block_size(len: u8) -> u64 {
    1u64 << (MAX_LENGTH - len.min(MAX_LENGTH))
}

/// First address after `after` where a block of `target_len` may legally start.
///
/// A block no bigger than `after` can start right after its broadcast
/// address. A bigger block must start on its own boundary, so the result
/// skips to the end of the `target_len` supernet enclosing `after`.
pub fn next_aligned_start(after: Ipv4, target_len: u8) -> u64 {
    let align_len = target_len.min(after.mask);
    let supernet = after.network_address() & u64::from(mask_bits(align_len));
    supernet + block_size(align_len)
}

/// IPv4 address with CIDR notation support.
#[derive(Eq, Ord, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ipv4 {
    fn deserialize<D>(deserializer: D) -> Result<Ipv4, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ipv4::parse_network(&s).map_err(de::Error::custom)
    }
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    ///
    /// Host bits are kept as given; use [`Ipv4::parse_network`] for a
    /// canonical network block.
    pub fn new(addr_cidr: &str) -> IpamResult<Ipv4> {
        let invalid = || IpamError::InvalidNetworkDescription(addr_cidr.to_string());
        let (addr, mask) = addr_cidr.trim().split_once('/').ok_or_else(invalid)?;
        let addr = Ipv4Addr::from_str(addr).map_err(|_| invalid())?;
        // u8 parsing alone would accept "+8"
        if mask.is_empty() || !mask.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mask = u8::from_str(mask).map_err(|_| invalid())?;
        if mask > MAX_LENGTH {
            return Err(invalid());
        }
        Ok(Ipv4 { addr, mask })
    }

    /// Parse CIDR text that must name a network: host bits must be zero.
    pub fn parse_network(addr_cidr: &str) -> IpamResult<Ipv4> {
        let ipv4 = Ipv4::new(addr_cidr)?;
        if ipv4.lo() != ipv4.addr {
            return Err(IpamError::InvalidNetworkDescription(format!(
                "{addr_cidr} has host bits set"
            )));
        }
        Ok(ipv4)
    }

    /// Build a block from its integer network address.
    pub fn from_u64(address: u64, mask: u8) -> IpamResult<Ipv4> {
        let addr = u32::try_from(address).map_err(|_| {
            IpamError::InvalidNetworkDescription(format!("address {address} is out of range"))
        })?;
        let ipv4 = Ipv4 {
            addr: Ipv4Addr::from(addr),
            mask,
        };
        if mask > MAX_LENGTH || ipv4.lo() != ipv4.addr {
            return Err(IpamError::InvalidNetworkDescription(format!(
                "{}/{mask}",
                ipv4.addr
            )));
        }
        Ok(ipv4)
    }

    /// Get the lowest (network) address in the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & mask_bits(self.mask))
    }

    /// Get the highest (broadcast) address in the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        let mask = mask_bits(self.mask);
        Ipv4Addr::from((u32::from(self.addr) & mask) | !mask)
    }

    pub fn network_address(&self) -> u64 {
        u64::from(u32::from(self.lo()))
    }

    pub fn broadcast_address(&self) -> u64 {
        u64::from(u32::from(self.hi()))
    }

    pub fn size(&self) -> u64 {
        block_size(self.mask)
    }

    /// True if `other` lies entirely inside this block (or equals it).
    pub fn contains(&self, other: &Ipv4) -> bool {
        other.mask >= self.mask
            && other.network_address() >= self.network_address()
            && other.broadcast_address() <= self.broadcast_address()
    }

    pub fn overlaps(&self, other: &Ipv4) -> bool {
        self.network_address() <= other.broadcast_address()
            && other.network_address() <= self.broadcast_address()
    }
}

impl FromStr for Ipv4 {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ipv4::parse_network(s)
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl PartialEq for Ipv4 {
    fn eq(&self, other: &Ipv4) -> bool {
        self.addr == other.addr && self.mask == other.mask
    }
}

impl PartialOrd for Ipv4 {
    fn partial_cmp(&self, other: &Ipv4) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
