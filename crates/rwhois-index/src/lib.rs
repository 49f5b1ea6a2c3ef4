//! In-memory search indexes for the RWhois store
//!
//! Three index shapes over `(key, value)` pairs, all backed by a sorted
//! vector with binary-search lookup:
//! - [`StringIndex`] - string keys, exact and prefix match
//! - [`CidrIndex`] - [`CidrPrefix`] keys, exact / subnet / supernet match
//! - [`ComboIndex`] - routes each key to one of the above depending on
//!   whether it parses as a CIDR
//!
//! An index starts in a mutable append-only state and is `prepare()`d
//! (sorted, deduplicated) before serving. Lookups on an unprepared index
//! still return the prepared answers via a linear scan, so a prepared,
//! post-load index can be shared immutably across connections.
//!
//! # Examples
//!
//! ```
//! use rwhois_index::StringIndex;
//!
//! let mut index = StringIndex::new();
//! index.add("foo", "foo-id");
//! index.add("foobar", "foo-id-2");
//! index.prepare();
//!
//! assert_eq!(index.find("foo", false, 0), vec!["foo-id"]);
//! assert_eq!(index.find("foo", true, 0), vec!["foo-id", "foo-id-2"]);
//! ```

use thiserror::Error;

mod cidr;
mod combo;
mod string;

pub use cidr::CidrIndex;
pub use combo::ComboIndex;
pub use string::StringIndex;

use rwhois_cidr::valid_cidr;

/// Index errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// Key could not be interpreted as a CIDR block or netblock range
    #[error("Invalid CIDR key: {0}")]
    InvalidCidrKey(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// One schema-routed index. The store keeps one of these per indexed
/// attribute and dispatches on the variant the schema asked for.
#[derive(Debug, Clone)]
pub enum Index {
    String(StringIndex),
    Cidr(CidrIndex),
    Combo(ComboIndex),
}

impl Index {
    /// Insert a key/value pair. String-keyed variants cannot fail; the
    /// CIDR variant rejects keys that are neither a CIDR block nor a
    /// dash-delimited netblock.
    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        match self {
            Index::String(index) => {
                index.add(key, value);
                Ok(())
            }
            Index::Cidr(index) => index.add(key, value),
            Index::Combo(index) => {
                index.add(key, value);
                Ok(())
            }
        }
    }

    pub fn prepare(&mut self) {
        match self {
            Index::String(index) => index.prepare(),
            Index::Cidr(index) => index.prepare(),
            Index::Combo(index) => index.prepare(),
        }
    }

    /// Whether this index can answer CIDR-shaped searches.
    pub fn supports_cidr(&self) -> bool {
        !matches!(self, Index::String(_))
    }

    /// Exact (or, with `prefix`, prefix/supernet) search. A CIDR index
    /// finds nothing for a key that does not parse as a CIDR.
    pub fn find(&self, key: &str, prefix: bool, max: usize) -> Vec<String> {
        match self {
            Index::String(index) => index.find(key, prefix, max),
            Index::Cidr(index) => match valid_cidr(key) {
                Some(cidr) => index.find(&cidr, prefix, max),
                None => Vec::new(),
            },
            Index::Combo(index) => index.find(key, prefix, max),
        }
    }

    /// Subnet search; `None` when this index (or this key) has no CIDR
    /// interpretation.
    pub fn find_subnets(&self, key: &str, max: usize) -> Option<Vec<String>> {
        match self {
            Index::String(_) => None,
            Index::Cidr(index) => valid_cidr(key).map(|cidr| index.find_subnets(&cidr, max)),
            Index::Combo(index) => index.find_subnets(key, max),
        }
    }

    /// Supernet search; `None` when there is no CIDR interpretation.
    pub fn find_supernets(&self, key: &str, max: usize) -> Option<Vec<String>> {
        match self {
            Index::String(_) => None,
            Index::Cidr(index) => valid_cidr(key).map(|cidr| index.find_supernets(&cidr, max)),
            Index::Combo(index) => index.find_supernets(key, max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_dispatch() {
        let mut index = Index::String(StringIndex::new());
        index.add("foo", "id-1").unwrap();
        index.prepare();
        assert!(!index.supports_cidr());
        assert_eq!(index.find("foo", false, 0), vec!["id-1"]);
        assert_eq!(index.find_subnets("foo", 0), None);
        assert_eq!(index.find_supernets("foo", 0), None);
    }

    #[test]
    fn test_cidr_variant_ignores_bad_keys_on_find() {
        let mut index = Index::Cidr(CidrIndex::new());
        index.add("10.0.0.0/24", "net-1").unwrap();
        index.prepare();
        assert!(index.supports_cidr());
        assert!(index.find("not-a-cidr", false, 0).is_empty());
        assert_eq!(index.find_subnets("not-a-cidr", 0), None);
    }

    #[test]
    fn test_cidr_variant_rejects_bad_keys_on_add() {
        let mut index = Index::Cidr(CidrIndex::new());
        assert!(index.add("bogus", "id").is_err());
    }
}
