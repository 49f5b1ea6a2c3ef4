//! Combined string + CIDR index.

use crate::{CidrIndex, StringIndex};
use rwhois_cidr::valid_cidr;

/// An index holding both a [`StringIndex`] and a [`CidrIndex`].
///
/// Each key is routed at add and find time: keys in valid CIDR notation
/// go to the CIDR side, everything else to the string side. Subnet and
/// supernet searches answer `None` (not empty) for keys with no CIDR
/// interpretation.
#[derive(Debug, Default, Clone)]
pub struct ComboIndex {
    string: StringIndex,
    cidr: CidrIndex,
}

impl ComboIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        match valid_cidr(key) {
            Some(prefix) => self.cidr.add_prefix(prefix, value),
            None => self.string.add(key, value),
        }
    }

    pub fn prepare(&mut self) {
        self.string.prepare();
        self.cidr.prepare();
    }

    pub fn find(&self, key: &str, prefix: bool, max: usize) -> Vec<String> {
        match valid_cidr(key) {
            Some(cidr) => self.cidr.find(&cidr, prefix, max),
            None => self.string.find(key, prefix, max),
        }
    }

    pub fn find_exact(&self, key: &str, max: usize) -> Vec<String> {
        match valid_cidr(key) {
            Some(cidr) => self.cidr.find_exact(&cidr, max),
            None => self.string.find(key, false, max),
        }
    }

    pub fn find_subnets(&self, key: &str, max: usize) -> Option<Vec<String>> {
        valid_cidr(key).map(|cidr| self.cidr.find_subnets(&cidr, max))
    }

    pub fn find_supernets(&self, key: &str, max: usize) -> Option<Vec<String>> {
        valid_cidr(key).map(|cidr| self.cidr.find_supernets(&cidr, max))
    }
}
