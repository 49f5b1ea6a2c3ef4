//! String-keyed index with exact and prefix lookup.

/// A sorted `(key, value)` sequence supporting binary-search exact and
/// prefix matches.
///
/// Entries are appended freely until [`prepare`](StringIndex::prepare)
/// sorts and deduplicates them; an `add` after that point does an
/// in-order insert that preserves both invariants.
#[derive(Debug, Default, Clone)]
pub struct StringIndex {
    entries: Vec<(String, String)>,
    sorted: bool,
}

impl StringIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a key/value pair. Cheap before `prepare`; an ordered insert
    /// afterwards. Duplicate `(key, value)` pairs are suppressed.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let entry = (key.into(), value.into());
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

    /// Values whose keys match `key` exactly, or start with `key` when
    /// `prefix` is set. Collects at most `max` values; `max == 0` means
    /// unlimited.
    ///
    /// A key opening with `*` is a pattern the sort order cannot serve;
    /// it falls back to a linear scan with suffix semantics, or
    /// substring semantics when `prefix` is also set (the caller saw a
    /// trailing `*` too).
    pub fn find(&self, key: &str, prefix: bool, max: usize) -> Vec<String> {
        if let Some(needle) = key.strip_prefix('*') {
            return self.scan_matching(
                |k| {
                    if prefix {
                        k.contains(needle)
                    } else {
                        k.ends_with(needle)
                    }
                },
                max,
            );
        }
        if !self.sorted {
            return self.scan_matching(
                |k| if prefix { k.starts_with(key) } else { k == key },
                max,
            );
        }
        let start = self.entries.partition_point(|(k, _)| k.as_str() < key);
        let mut res = Vec::new();
        for (k, v) in &self.entries[start..] {
            if max != 0 && res.len() == max {
                break;
            }
            let matched = if prefix { k.starts_with(key) } else { k == key };
            if !matched {
                break;
            }
            res.push(v.clone());
        }
        res
    }

    // Linear fallback with the same answers a prepared walk would give.
    fn scan_matching(&self, keep: impl Fn(&str) -> bool, max: usize) -> Vec<String> {
        let mut matches: Vec<&(String, String)> =
            self.entries.iter().filter(|(k, _)| keep(k)).collect();
        matches.sort_unstable();
        matches.dedup();
        if max != 0 {
            matches.truncate(max);
        }
        matches.into_iter().map(|(_, v)| v.clone()).collect()
    }
}
