//! CIDR-keyed index with exact, subnet and supernet lookup.

use crate::{IndexError, Result};
use rwhois_cidr::{netblock_to_cidr, valid_cidr, CidrPrefix};
use std::collections::HashSet;

/// A sorted `(CidrPrefix, value)` sequence.
///
/// The prefix ordering puts every subnet of `K` in a contiguous run
/// beginning at the lower bound of `K`, so subnet search is a binary
/// search plus a walk. Supernet search re-masks the key one bit at a
/// time and does an exact probe per length, O(maxlen · log N).
#[derive(Debug, Default, Clone)]
pub struct CidrIndex {
    entries: Vec<(CidrPrefix, String)>,
    sorted: bool,
}

impl CidrIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a string key. A dash-delimited netblock (`"a - b"`) expands
    /// into its covering prefixes, each mapped to the same value.
    pub fn add(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        if key.contains('-') {
            let (start, end) = match key.split_once('-') {
                Some(parts) => parts,
                None => return Err(IndexError::InvalidCidrKey(key.to_string())),
            };
            let blocks = netblock_to_cidr(start.trim(), end.trim())
                .ok_or_else(|| IndexError::InvalidCidrKey(key.to_string()))?;
            for block in blocks {
                self.add_prefix(block, value.clone());
            }
            return Ok(());
        }
        let prefix =
            valid_cidr(key).ok_or_else(|| IndexError::InvalidCidrKey(key.to_string()))?;
        self.add_prefix(prefix, value);
        Ok(())
    }

    /// Add an already-parsed prefix key.
    pub fn add_prefix(&mut self, key: CidrPrefix, value: impl Into<String>) {
        let entry = (key, value.into());
        if self.sorted {
            if let Err(pos) = self.entries.binary_search(&entry) {
                self.entries.insert(pos, entry);
            }
        } else {
            self.entries.push(entry);
        }
    }

    /// Sort and deduplicate. Idempotent.
    pub fn prepare(&mut self) {
        if !self.sorted {
            self.entries.sort_unstable();
            self.entries.dedup();
            self.sorted = true;
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.sorted
    }

    fn lower_bound(&self, key: &CidrPrefix) -> usize {
        self.entries.partition_point(|(k, _)| k < key)
    }

    // Walk the run at lower_bound(key) while `keep` holds. The
    // unprepared fallback filters the same run predicate linearly.
    fn collect_run(
        &self,
        key: &CidrPrefix,
        max: usize,
        keep: impl Fn(&CidrPrefix) -> bool,
    ) -> Vec<String> {
        let mut res = Vec::new();
        if self.sorted {
            for (k, v) in &self.entries[self.lower_bound(key)..] {
                if max != 0 && res.len() == max {
                    break;
                }
                if !keep(k) {
                    break;
                }
                res.push(v.clone());
            }
        } else {
            let mut matches: Vec<&(CidrPrefix, String)> = self
                .entries
                .iter()
                .filter(|(k, _)| k >= key && keep(k))
                .collect();
            matches.sort_unstable();
            matches.dedup();
            if max != 0 {
                matches.truncate(max);
            }
            res.extend(matches.into_iter().map(|(_, v)| v.clone()));
        }
        res
    }

    /// Values stored under exactly `key`.
    pub fn find_exact(&self, key: &CidrPrefix, max: usize) -> Vec<String> {
        self.collect_run(key, max, |k| k == key)
    }

    /// Values of all subnets of `key`, `key` itself included. Values are
    /// deduplicated: a netblock expansion stores one value under several
    /// prefixes.
    pub fn find_subnets(&self, key: &CidrPrefix, max: usize) -> Vec<String> {
        let raw = self.collect_run(key, 0, |k| k.is_subnet(key));
        let mut seen = HashSet::new();
        let mut res = Vec::new();
        for value in raw {
            if max != 0 && res.len() == max {
                break;
            }
            if seen.insert(value.clone()) {
                res.push(value);
            }
        }
        res
    }

    /// Values of all supernets of `key`, `key` itself included, nearest
    /// first.
    pub fn find_supernets(&self, key: &CidrPrefix, max: usize) -> Vec<String> {
        let mut res = Vec::new();
        for k in key.supernets() {
            res.extend(self.find_exact(&k, 0));
            if max != 0 && res.len() >= max {
                res.truncate(max);
                return res;
            }
        }
        res
    }

    /// Exact match, falling back to the closest proper supernet when
    /// nothing matches exactly. With `prefix` set, all supernets.
    pub fn find(&self, key: &CidrPrefix, prefix: bool, max: usize) -> Vec<String> {
        if prefix {
            return self.find_supernets(key, max);
        }
        let res = self.find_exact(key, max);
        if !res.is_empty() {
            return res;
        }
        for k in key.supernets().skip(1) {
            let res = self.find_exact(&k, max);
            if !res.is_empty() {
                return res;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> CidrPrefix {
        CidrPrefix::parse(s).unwrap()
    }

    fn sample() -> CidrIndex {
        let mut index = CidrIndex::new();
        index.add("127.0.0.1/24", "net-local-1").unwrap();
        index.add("127.0.0.1/32", "net-local-2").unwrap();
        index.add("216.168.224.0/22", "net-vrsn-1").unwrap();
        index.add("216.168.252.1/32", "net-vrsn-2").unwrap();
        index.add("24.36.191.0/24", "net-foo-c").unwrap();
        index.add("24.36.191.32/27", "net-foo-sub-c").unwrap();
        index.add("24.36/16", "net-foo-b").unwrap();
        index.add("3ffe:4:5::0/48", "net-foo-d6").unwrap();
        index.add("3ffe:4:5:6::0/64", "net-foo-e6").unwrap();
        index.add("48.12.6.0 - 48.12.6.95", "net-bar-1").unwrap();
        index.prepare();
        index
    }

    #[test]
    fn test_find_exact() {
        let index = sample();
        assert_eq!(index.find(&cidr("127.0.0.0/24"), false, 0), vec!["net-local-1"]);
        assert_eq!(
            index.find_exact(&cidr("3ffe:4:5:6::/64"), 0),
            vec!["net-foo-e6"]
        );
    }

    #[test]
    fn test_find_closest_supernet_fallback() {
        let index = sample();
        // 127.0.0.16/32 is not stored; its closest supernet is the /24
        assert_eq!(index.find(&cidr("127.0.0.16/32"), false, 0), vec!["net-local-1"]);
    }

    #[test]
    fn test_find_supernets() {
        let index = sample();
        assert_eq!(
            index.find_supernets(&cidr("127.0.0.16/32"), 0),
            vec!["net-local-1"]
        );
        assert_eq!(
            index.find_supernets(&cidr("24.36.191.33/27"), 0),
            vec!["net-foo-sub-c", "net-foo-c", "net-foo-b"]
        );
        assert_eq!(
            index.find_supernets(&cidr("24.36.191.64/27"), 0),
            vec!["net-foo-c", "net-foo-b"]
        );
        assert_eq!(
            index.find_supernets(&cidr("3ffe:4:5:6:7::0/80"), 0),
            vec!["net-foo-e6", "net-foo-d6"]
        );
    }

    #[test]
    fn test_find_supernets_of_netblock_member() {
        let index = sample();
        assert_eq!(
            index.find_supernets(&cidr("48.12.6.90"), 0),
            vec!["net-bar-1"]
        );
    }

    #[test]
    fn test_find_subnets() {
        let index = sample();
        assert_eq!(
            index.find_subnets(&cidr("127.0/16"), 0),
            vec!["net-local-1", "net-local-2"]
        );
        assert_eq!(
            index.find_subnets(&cidr("3ffe:4::0/32"), 0),
            vec!["net-foo-d6", "net-foo-e6"]
        );
    }

    #[test]
    fn test_find_subnets_dedups_netblock_values() {
        let index = sample();
        // the 48.12.6.0-95 netblock stores several prefixes for one value
        assert_eq!(
            index.find_subnets(&cidr("48.12.0.0/16"), 0),
            vec!["net-bar-1"]
        );
    }

    #[test]
    fn test_subnets_exclude_sibling_and_supernet() {
        let mut index = CidrIndex::new();
        index.add("10.0.0.0/8", "big").unwrap();
        index.add("10.1.0.0/16", "inside").unwrap();
        index.add("11.0.0.0/16", "outside").unwrap();
        index.prepare();
        assert_eq!(index.find_subnets(&cidr("10.0.0.0/12"), 0), vec!["inside"]);
    }

    #[test]
    fn test_max_caps_results() {
        let index = sample();
        assert_eq!(index.find_supernets(&cidr("24.36.191.33/27"), 2).len(), 2);
        assert_eq!(index.find_subnets(&cidr("0.0.0.0/0"), 3).len(), 3);
    }

    #[test]
    fn test_add_after_prepare() {
        let mut index = sample();
        index.add("127.0.0.64/26", "net-local-3").unwrap();
        assert_eq!(
            index.find_subnets(&cidr("127.0/16"), 0),
            vec!["net-local-1", "net-local-2", "net-local-3"]
        );
    }

    #[test]
    fn test_invalid_key() {
        let mut index = CidrIndex::new();
        assert_eq!(
            index.add("not-an-ip - also-not", "x"),
            Err(IndexError::InvalidCidrKey("not-an-ip - also-not".to_string()))
        );
        assert!(index.add("299.0.0.1", "x").is_err());
    }

    #[test]
    fn test_unprepared_find_matches_prepared() {
        let mut index = CidrIndex::new();
        index.add("10.0.0.0/8", "a").unwrap();
        index.add("10.1.0.0/16", "b").unwrap();
        index.add("10.1.2.0/24", "c").unwrap();
        let prepared = {
            let mut p = index.clone();
            p.prepare();
            p
        };
        let key = cidr("10.1.0.0/16");
        assert_eq!(index.find_exact(&key, 0), prepared.find_exact(&key, 0));
        assert_eq!(index.find_subnets(&key, 0), prepared.find_subnets(&key, 0));
        assert_eq!(
            index.find_supernets(&key, 0),
            prepared.find_supernets(&key, 0)
        );
    }
}
