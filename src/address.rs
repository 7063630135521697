//! Address and CIDR parsing into a family-tagged binary form.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{CloudInfoError, Result};

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    Ipv4,
    Ipv6,
}

impl Family {
    /// Width of an address of this family, in bits.
    pub fn bits(self) -> u8 {
        match self {
            Family::Ipv4 => 32,
            Family::Ipv6 => 128,
        }
    }

    /// Width of an address of this family, in bytes.
    pub fn byte_len(self) -> usize {
        usize::from(self.bits() / 8)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Ipv4 => write!(f, "IPv4"),
            Family::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// An IPv4 or IPv6 address held as raw network-order bytes.
///
/// The family is carried by the variant, so a 4-byte and a 16-byte address are
/// never equal, even when the IPv6 one is an IPv4-mapped form of the other.
/// Use [`Address::to_canonical`] to opt into that equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl Address {
    /// Build an address from a 4-byte or 16-byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
            return Ok(Address::V4(octets));
        }
        if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
            return Ok(Address::V6(octets));
        }
        Err(CloudInfoError::InvalidAddress(format!(
            "{} bytes (expected 4 or 16)",
            bytes.len()
        )))
    }

    pub fn family(&self) -> Family {
        match self {
            Address::V4(_) => Family::Ipv4,
            Address::V6(_) => Family::Ipv6,
        }
    }

    pub fn octets(&self) -> &[u8] {
        match self {
            Address::V4(octets) => octets,
            Address::V6(octets) => octets,
        }
    }

    /// The address as an unsigned integer, right-aligned for IPv4.
    pub fn to_bits(&self) -> u128 {
        match self {
            Address::V4(octets) => u128::from(u32::from_be_bytes(*octets)),
            Address::V6(octets) => u128::from_be_bytes(*octets),
        }
    }

    /// Collapse an IPv4-mapped IPv6 address (`::ffff:a.b.c.d`) to plain IPv4.
    pub fn to_canonical(self) -> Self {
        match self {
            Address::V6(octets) => match Ipv6Addr::from(octets).to_ipv4_mapped() {
                Some(v4) => Address::V4(v4.octets()),
                None => self,
            },
            Address::V4(_) => self,
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Address::V4(v4.octets()),
            IpAddr::V6(v6) => Address::V6(v6.octets()),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address::V4(ip.octets())
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address::V6(ip.octets())
    }
}

impl From<Address> for IpAddr {
    fn from(address: Address) -> Self {
        match address {
            Address::V4(octets) => IpAddr::from(octets),
            Address::V6(octets) => IpAddr::from(octets),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        IpAddr::from(*self).fmt(f)
    }
}

impl FromStr for Address {
    type Err = CloudInfoError;

    fn from_str(s: &str) -> Result<Self> {
        parse_address(s)
    }
}

/// Parse dotted-quad IPv4 or colon-hex IPv6 text (including `::` runs and
/// embedded IPv4 tails) into an [`Address`].
pub fn parse_address(text: &str) -> Result<Address> {
    text.parse::<IpAddr>()
        .map(Address::from)
        .map_err(|_| CloudInfoError::InvalidAddress(text.to_string()))
}

/// A block of addresses sharing the top `prefix_len` bits with `base`.
///
/// `base` is kept exactly as given; host bits below the prefix are ignored by
/// matching but not cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CidrRange {
    base: Address,
    prefix_len: u8,
}

impl CidrRange {
    /// Create a range, rejecting a prefix length wider than the family.
    pub fn new(base: Address, prefix_len: u8) -> Result<Self> {
        if prefix_len > base.family().bits() {
            return Err(CloudInfoError::InvalidCidr(format!("{}/{}", base, prefix_len)));
        }
        Ok(Self { base, prefix_len })
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn family(&self) -> Family {
        self.base.family()
    }

    /// Whether `address` shares this range's first `prefix_len` bits.
    ///
    /// Addresses of the other family never match.
    pub fn contains(&self, address: &Address) -> bool {
        if self.family() != address.family() {
            return false;
        }

        let base = self.base.octets();
        let other = address.octets();
        let whole = usize::from(self.prefix_len / 8);
        let remaining = self.prefix_len % 8;

        if base[..whole] != other[..whole] {
            return false;
        }
        if remaining == 0 {
            return true;
        }

        let mask = 0xFFu8 << (8 - remaining);
        (base[whole] ^ other[whole]) & mask == 0
    }

    /// Bits below the prefix, as a right-aligned mask.
    fn host_mask(&self) -> u128 {
        let full = match self.family() {
            Family::Ipv4 => u128::from(u32::MAX),
            Family::Ipv6 => u128::MAX,
        };
        full.checked_shr(u32::from(self.prefix_len)).unwrap_or(0)
    }

    /// First and last address of the block as integers (see [`Address::to_bits`]).
    pub fn bounds(&self) -> (u128, u128) {
        let host_mask = self.host_mask();
        let first = self.base.to_bits() & !host_mask;
        (first, first | host_mask)
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

impl FromStr for CidrRange {
    type Err = CloudInfoError;

    fn from_str(s: &str) -> Result<Self> {
        parse_cidr(s)
    }
}

/// Parse `address/prefix-length` notation.
///
/// The prefix length must be plain decimal digits no larger than the
/// address family's bit width.
pub fn parse_cidr(text: &str) -> Result<CidrRange> {
    let invalid = || CloudInfoError::InvalidCidr(text.to_string());

    let (address, prefix_len) = text.split_once('/').ok_or_else(invalid)?;
    let base = parse_address(address).map_err(|_| invalid())?;

    if prefix_len.is_empty() || !prefix_len.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let prefix_len: u8 = prefix_len.parse().map_err(|_| invalid())?;

    CidrRange::new(base, prefix_len).map_err(|_| invalid())
}
