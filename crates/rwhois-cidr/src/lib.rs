//! CIDR prefix arithmetic for RWhois network data
//!
//! Provides the prefix value type the directory indexes are keyed on:
//! - Parse CIDR notation for both families (e.g., "10.0.0.0/8", "3ffe:4:5::/48")
//! - Containment tests (supernet/subnet, reflexive)
//! - An ordering that places supernets before the subnets sharing their
//!   start address, so subnets of a prefix form a contiguous run in a
//!   sorted sequence
//! - Conversion of `start - end` netblocks into minimal CIDR covers
//!
//! IPv4 addresses may be written with fewer than four octets, as they
//! appear in legacy registry data: `"24.36/16"` is `24.36.0.0/16`.
//!
//! # Examples
//!
//! ```
//! use rwhois_cidr::CidrPrefix;
//!
//! let net = CidrPrefix::parse("192.168.1.0/24").unwrap();
//! assert_eq!(net.prefix_len(), 24);
//! assert_eq!(net.netmask(), "255.255.255.0");
//!
//! let host = CidrPrefix::parse("192.168.1.77").unwrap();
//! assert!(net.is_supernet(&host));
//! assert!(host.is_subnet(&net));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use thiserror::Error;

/// CIDR errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CidrError {
    /// Address string could not be parsed for its family
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Prefix length out of range for the family
    #[error("Invalid prefix length: {0} (must be 0-{1})")]
    InvalidPrefixLength(u8, u8),
}

pub type Result<T> = std::result::Result<T, CidrError>;

/// Address family of a prefix.
///
/// V4 orders before V6 so mixed-family indexes keep each family
/// contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Number of bits in an address of this family
    pub fn max_len(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    fn bits(self) -> u128 {
        match self {
            Family::V4 => u32::MAX as u128,
            Family::V6 => u128::MAX,
        }
    }
}

/// A CIDRized network block: a family, a masked numeric start address and
/// a prefix length.
///
/// The numeric address is stored widened to `u128` for both families and
/// is always canonical: every bit below the prefix boundary is zero.
///
/// The derived ordering compares family, then start address, then prefix
/// length, which sorts a supernet immediately before the subnets that
/// share its start address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CidrPrefix {
    family: Family,
    num: u128,
    netlen: u8,
}

fn mask_for(family: Family, netlen: u8) -> u128 {
    if netlen == 0 {
        0
    } else {
        family.bits() & !((1u128 << (family.max_len() - netlen)) - 1)
    }
}

fn parse_v4(addr: &str) -> Result<u128> {
    let octets: Vec<&str> = addr.split('.').collect();
    if octets.is_empty() || octets.len() > 4 {
        return Err(CidrError::InvalidAddress(addr.to_string()));
    }
    let mut num = 0u128;
    for (i, octet) in octets.iter().enumerate() {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CidrError::InvalidAddress(addr.to_string()));
        }
        let value: u32 = octet
            .parse()
            .map_err(|_| CidrError::InvalidAddress(addr.to_string()))?;
        if value > 255 {
            return Err(CidrError::InvalidAddress(addr.to_string()));
        }
        num |= (value as u128) << (24 - i * 8);
    }
    Ok(num)
}

fn format_v4(num: u128) -> String {
    format!(
        "{}.{}.{}.{}",
        (num >> 24) & 0xFF,
        (num >> 16) & 0xFF,
        (num >> 8) & 0xFF,
        num & 0xFF
    )
}

impl CidrPrefix {
    /// Parse a CIDR string, with or without a `/len` suffix.
    ///
    /// A colon in the address selects IPv6, otherwise IPv4. Without a
    /// suffix the prefix length defaults to the family's full length,
    /// i.e. a single host. IPv4 accepts 1 to 4 octets; missing low
    /// octets are zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use rwhois_cidr::CidrPrefix;
    ///
    /// let block = CidrPrefix::parse("24.36/16").unwrap();
    /// assert_eq!(block.to_string(), "24.36.0.0/16");
    ///
    /// let host = CidrPrefix::parse("3ffe:4:5::1").unwrap();
    /// assert_eq!(host.prefix_len(), 128);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match text.split_once('/') {
            Some((addr, len)) => {
                let netlen: u8 = len
                    .parse()
                    .map_err(|_| CidrError::InvalidAddress(text.to_string()))?;
                Self::new(addr, netlen)
            }
            None => {
                let family = Self::family_of(text);
                Self::new(text, family.max_len())
            }
        }
    }

    /// Construct from an address string and an explicit prefix length.
    pub fn new(addr: &str, netlen: u8) -> Result<Self> {
        let addr = addr.trim();
        let family = Self::family_of(addr);
        if netlen > family.max_len() {
            return Err(CidrError::InvalidPrefixLength(netlen, family.max_len()));
        }
        let num = match family {
            Family::V4 => parse_v4(addr)?,
            Family::V6 => addr
                .parse::<Ipv6Addr>()
                .map(u128::from)
                .map_err(|_| CidrError::InvalidAddress(addr.to_string()))?,
        };
        Ok(Self {
            family,
            num: num & mask_for(family, netlen),
            netlen,
        })
    }

    /// Construct from a numeric address, canonicalising the host bits away.
    pub fn from_numeric(family: Family, num: u128, netlen: u8) -> Result<Self> {
        if netlen > family.max_len() {
            return Err(CidrError::InvalidPrefixLength(netlen, family.max_len()));
        }
        Ok(Self {
            family,
            num: num & mask_for(family, netlen),
            netlen,
        })
    }

    fn family_of(addr: &str) -> Family {
        if addr.contains(':') {
            Family::V6
        } else {
            Family::V4
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Masked numeric start address
    pub fn numeric(&self) -> u128 {
        self.num
    }

    pub fn prefix_len(&self) -> u8 {
        self.netlen
    }

    /// Network mask as a number
    pub fn mask(&self) -> u128 {
        mask_for(self.family, self.netlen)
    }

    /// Network mask in address notation
    ///
    /// # Examples
    ///
    /// ```
    /// use rwhois_cidr::CidrPrefix;
    ///
    /// let net = CidrPrefix::parse("10.0.0.0/26").unwrap();
    /// assert_eq!(net.netmask(), "255.255.255.192");
    /// ```
    pub fn netmask(&self) -> String {
        self.format_addr(self.mask())
    }

    /// Number of addresses in the block, saturating at `u128::MAX` for
    /// the full IPv6 space.
    pub fn size(&self) -> u128 {
        let host_bits = (self.family.max_len() - self.netlen) as u32;
        1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
    }

    /// Last address in the block, in address notation
    pub fn end(&self) -> String {
        self.format_addr(self.end_numeric())
    }

    /// Last address in the block, numeric
    pub fn end_numeric(&self) -> u128 {
        self.num | (self.family.bits() ^ self.mask())
    }

    /// True if this block encloses `other`. A prefix is a supernet of
    /// itself.
    pub fn is_supernet(&self, other: &CidrPrefix) -> bool {
        self.family == other.family && (other.num & self.mask()) == self.num
    }

    /// True if this block is enclosed by `other`. Reflexive.
    pub fn is_subnet(&self, other: &CidrPrefix) -> bool {
        self.family == other.family && (self.num & other.mask()) == other.num
    }

    /// Every enclosing prefix of this one, starting with itself and
    /// widening one bit at a time down to `/0`. Each step is
    /// re-canonicalised.
    pub fn supernets(&self) -> impl Iterator<Item = CidrPrefix> {
        let family = self.family;
        let num = self.num;
        (0..=self.netlen).rev().map(move |netlen| CidrPrefix {
            family,
            num: num & mask_for(family, netlen),
            netlen,
        })
    }

    fn format_addr(&self, num: u128) -> String {
        match self.family {
            Family::V4 => format_v4(num),
            Family::V6 => Ipv6Addr::from(num).to_string(),
        }
    }
}

impl fmt::Display for CidrPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.format_addr(self.num), self.netlen)
    }
}

/// Parse leniently: `Some` for any string in valid CIDR notation, `None`
/// otherwise. Never fails loudly; query values and auth-area names are
/// probed with this.
pub fn valid_cidr(text: &str) -> Option<CidrPrefix> {
    CidrPrefix::parse(text).ok()
}

/// Decompose the inclusive address range `[start, end]` into the minimal
/// ordered list of CIDR blocks covering it exactly.
///
/// Returns `None` when either endpoint is invalid, the families differ,
/// or the range is reversed.
///
/// # Examples
///
/// ```
/// use rwhois_cidr::netblock_to_cidr;
///
/// let cover = netblock_to_cidr("192.168.10.0", "192.168.10.63").unwrap();
/// assert_eq!(cover.len(), 1);
/// assert_eq!(cover[0].to_string(), "192.168.10.0/26");
/// ```
pub fn netblock_to_cidr(start: &str, end: &str) -> Option<Vec<CidrPrefix>> {
    let start = valid_cidr(start)?;
    let end = valid_cidr(end)?;
    if start.family() != end.family() {
        return None;
    }
    let family = start.family();
    let max_len = family.max_len() as u32;
    let end_num = end.numeric();
    let mut cur = start.numeric();
    if cur > end_num {
        return None;
    }

    let mut blocks = Vec::new();
    loop {
        // widest block that starts at cur: bounded by the alignment of
        // cur and by the number of addresses left in the range
        let align_bits = if cur == 0 {
            max_len
        } else {
            cur.trailing_zeros().min(max_len)
        };
        let span = end_num - cur;
        let size_bits = if span == u128::MAX {
            max_len
        } else {
            127 - (span + 1).leading_zeros()
        };
        let host_bits = align_bits.min(size_bits);
        let netlen = (max_len - host_bits) as u8;
        // construction cannot fail: cur is aligned to netlen by choice
        // of host_bits
        if let Ok(block) = CidrPrefix::from_numeric(family, cur, netlen) {
            blocks.push(block);
        }
        if host_bits >= 128 {
            break;
        }
        match cur.checked_add(1u128 << host_bits) {
            Some(next) if next <= end_num => cur = next,
            _ => break,
        }
    }
    Some(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v4() {
        let c = CidrPrefix::parse("192.168.1.0/24").unwrap();
        assert_eq!(c.family(), Family::V4);
        assert_eq!(c.numeric(), 0xC0A80100);
        assert_eq!(c.prefix_len(), 24);
    }

    #[test]
    fn test_parse_v4_partial_octets() {
        assert_eq!(
            CidrPrefix::parse("24.36/16").unwrap().to_string(),
            "24.36.0.0/16"
        );
        assert_eq!(
            CidrPrefix::parse("10/8").unwrap().to_string(),
            "10.0.0.0/8"
        );
    }

    #[test]
    fn test_parse_v4_default_netlen() {
        let c = CidrPrefix::parse("127.0.0.1").unwrap();
        assert_eq!(c.prefix_len(), 32);
        assert_eq!(c.to_string(), "127.0.0.1/32");
    }

    #[test]
    fn test_parse_v6() {
        let c = CidrPrefix::parse("3ffe:4:5::/48").unwrap();
        assert_eq!(c.family(), Family::V6);
        assert_eq!(c.prefix_len(), 48);
        assert_eq!(c.to_string(), "3ffe:4:5::/48");
    }

    #[test]
    fn test_parse_v6_embedded_v4() {
        let c = CidrPrefix::parse("::ffff:1.2.3.4").unwrap();
        assert_eq!(c.prefix_len(), 128);
        assert_eq!(c.numeric() & 0xFFFF_FFFF, 0x01020304);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(CidrPrefix::parse("256.0.0.0/24").is_err());
        assert!(CidrPrefix::parse("10.0.0.0/33").is_err());
        assert!(CidrPrefix::parse("3ffe::/129").is_err());
        assert!(CidrPrefix::parse("a.com").is_err());
        assert!(CidrPrefix::parse("1.2.3.4.5").is_err());
        assert!(CidrPrefix::parse("1.2.3.+4").is_err());
        assert!(CidrPrefix::parse(":::").is_err());
        assert!(CidrPrefix::parse("1::2::3").is_err());
    }

    #[test]
    fn test_canonical_form() {
        let c = CidrPrefix::parse("127.0.0.1/24").unwrap();
        assert_eq!(c.to_string(), "127.0.0.0/24");
        assert_eq!(c.numeric(), c.numeric() & c.mask());

        let v6 = CidrPrefix::parse("3ffe:4:5:6::1/64").unwrap();
        assert_eq!(v6.to_string(), "3ffe:4:5:6::/64");
    }

    #[test]
    fn test_netmask_and_size() {
        let c = CidrPrefix::parse("216.168.111.0/27").unwrap();
        assert_eq!(c.netmask(), "255.255.255.224");
        assert_eq!(c.size(), 32);
        assert_eq!(c.end(), "216.168.111.31");

        let all = CidrPrefix::parse("0.0.0.0/0").unwrap();
        assert_eq!(all.netmask(), "0.0.0.0");
        assert_eq!(all.size(), 1u128 << 32);

        let v6_all = CidrPrefix::parse("::/0").unwrap();
        assert_eq!(v6_all.size(), u128::MAX);
    }

    #[test]
    fn test_containment() {
        let net = CidrPrefix::parse("24.232.119.0/24").unwrap();
        let sub = CidrPrefix::parse("24.232.119.192/26").unwrap();
        let other = CidrPrefix::parse("24.232.120.0/24").unwrap();

        assert!(net.is_supernet(&sub));
        assert!(sub.is_subnet(&net));
        assert!(!net.is_subnet(&sub));
        assert!(!net.is_supernet(&other));

        // reflexive
        assert!(net.is_supernet(&net));
        assert!(net.is_subnet(&net));
    }

    #[test]
    fn test_containment_is_family_aware() {
        let v4 = CidrPrefix::parse("0.0.0.0/0").unwrap();
        let v6 = CidrPrefix::parse("::/0").unwrap();
        assert!(!v4.is_supernet(&v6));
        assert!(!v6.is_supernet(&v4));
    }

    #[test]
    fn test_ordering_supernet_first() {
        let mut list = vec![
            CidrPrefix::parse("127.0.0.16/32").unwrap(),
            CidrPrefix::parse("24.232.119.192/26").unwrap(),
            CidrPrefix::parse("127.0.0.0/24").unwrap(),
            CidrPrefix::parse("24.224.0.0/11").unwrap(),
            CidrPrefix::parse("24.232.119.0/24").unwrap(),
            CidrPrefix::parse("127.0.0.0/32").unwrap(),
        ];
        list.sort();
        let strs: Vec<String> = list.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            strs,
            vec![
                "24.224.0.0/11",
                "24.232.119.0/24",
                "24.232.119.192/26",
                "127.0.0.0/24",
                "127.0.0.0/32",
                "127.0.0.16/32",
            ]
        );
    }

    #[test]
    fn test_ordering_v4_before_v6() {
        let v4 = CidrPrefix::parse("255.255.255.255/32").unwrap();
        let v6 = CidrPrefix::parse("::/0").unwrap();
        assert!(v4 < v6);
    }

    #[test]
    fn test_supernets_walk() {
        let c = CidrPrefix::parse("10.131.43.64/26").unwrap();
        let walk: Vec<CidrPrefix> = c.supernets().collect();
        assert_eq!(walk.len(), 27);
        assert_eq!(walk[0], c);
        assert_eq!(walk[1].to_string(), "10.131.43.0/25");
        assert_eq!(walk[2].to_string(), "10.131.43.0/24");
        assert_eq!(walk[26].to_string(), "0.0.0.0/0");
    }

    #[test]
    fn test_valid_cidr() {
        assert!(valid_cidr("10.0.0.0/8").is_some());
        assert!(valid_cidr("123").is_some());
        assert!(valid_cidr("a.com").is_none());
        assert!(valid_cidr("10.0.0.0 - 10.0.0.255").is_none());
        assert!(valid_cidr("").is_none());
    }

    #[test]
    fn test_netblock_single_block() {
        let cover = netblock_to_cidr("192.168.10.0", "192.168.10.63").unwrap();
        let strs: Vec<String> = cover.iter().map(|c| c.to_string()).collect();
        assert_eq!(strs, vec!["192.168.10.0/26"]);
    }

    #[test]
    fn test_netblock_ragged_range() {
        let cover = netblock_to_cidr("10.131.43.3", "10.131.44.7").unwrap();
        let strs: Vec<String> = cover.iter().map(|c| c.to_string()).collect();
        assert_eq!(
            strs,
            vec![
                "10.131.43.3/32",
                "10.131.43.4/30",
                "10.131.43.8/29",
                "10.131.43.16/28",
                "10.131.43.32/27",
                "10.131.43.64/26",
                "10.131.43.128/25",
                "10.131.44.0/29",
            ]
        );
    }

    #[test]
    fn test_netblock_exact_union() {
        let cover = netblock_to_cidr("48.12.6.0", "48.12.6.95").unwrap();
        // no overlap, no gap
        let mut expect = CidrPrefix::parse("48.12.6.0").unwrap().numeric();
        for block in &cover {
            assert_eq!(block.numeric(), expect);
            expect = block.end_numeric() + 1;
        }
        let last = cover.last().unwrap();
        assert_eq!(last.end(), "48.12.6.95");
    }

    #[test]
    fn test_netblock_single_address() {
        let cover = netblock_to_cidr("10.0.0.7", "10.0.0.7").unwrap();
        let strs: Vec<String> = cover.iter().map(|c| c.to_string()).collect();
        assert_eq!(strs, vec!["10.0.0.7/32"]);
    }

    #[test]
    fn test_netblock_full_v4() {
        let cover = netblock_to_cidr("0.0.0.0", "255.255.255.255").unwrap();
        let strs: Vec<String> = cover.iter().map(|c| c.to_string()).collect();
        assert_eq!(strs, vec!["0.0.0.0/0"]);
    }

    #[test]
    fn test_netblock_rejects_bad_input() {
        assert!(netblock_to_cidr("10.0.0.9", "10.0.0.1").is_none());
        assert!(netblock_to_cidr("10.0.0.1", "3ffe::1").is_none());
        assert!(netblock_to_cidr("bogus", "10.0.0.1").is_none());
    }

    #[test]
    fn test_netblock_v6() {
        let cover = netblock_to_cidr("3ffe:4:5::", "3ffe:4:5:0:ffff:ffff:ffff:ffff").unwrap();
        let strs: Vec<String> = cover.iter().map(|c| c.to_string()).collect();
        assert_eq!(strs, vec!["3ffe:4:5::/64"]);
    }

    #[test]
    fn test_round_trip() {
        for s in ["127.0.0.0/24", "10.0.0.0/8", "3ffe:4:5::/48", "::1/128"] {
            let c = CidrPrefix::parse(s).unwrap();
            assert_eq!(c.to_string(), s);
        }
    }
}
