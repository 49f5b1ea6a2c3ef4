//! Schema-driven in-memory object store
//!
//! The [`Store`] owns every loaded [`RwhoisObject`] plus one search
//! index per indexed attribute, routed by the schema's index type:
//!
//! - `N` - string index (exact/prefix)
//! - `C` - CIDR index (exact/subnet/supernet)
//! - `A` - combined index, searched by unconstrained queries
//! - `R` - referral index, searched only when named explicitly
//!
//! After loading, [`Store::index_data`] prepares all indexes and the
//! store is shared immutably across sessions.
//!
//! # Examples
//!
//! ```
//! use rwhois_core::RwhoisObject;
//! use rwhois_store::Store;
//!
//! let mut store = Store::new();
//! store.init_schema("domain-name = N\nip-network = C\n").unwrap();
//!
//! let mut obj = RwhoisObject::new();
//! obj.add_attr("id", "1");
//! obj.add_attr("class-name", "domain");
//! obj.add_attr("domain-name", "a.com");
//! store.add_object(obj);
//! store.index_data();
//!
//! let hits = store.search_attr("domain-name", "a.com", 0);
//! assert_eq!(hits.ids(), ["1"]);
//! ```

use rwhois_cidr::valid_cidr;
use rwhois_core::RwhoisObject;
use rwhois_index::{CidrIndex, ComboIndex, Index, StringIndex};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

pub mod loader;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema line is not `attr = type`
    #[error("Invalid schema line {line}: {text:?}")]
    InvalidSchemaLine { line: usize, text: String },

    /// Schema names an index type other than N, C, A or R
    #[error("Unknown index type {kind:?} for attribute {attr:?}")]
    UnknownIndexType { attr: String, kind: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// How an attribute is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// String index
    Normal,
    /// CIDR index
    Cidr,
    /// Combined index, part of unconstrained searches
    All,
    /// Combined index, searched only by name
    Referral,
}

impl IndexKind {
    /// Parse the schema-file letter (first character, case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        match text.chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('N') => Some(IndexKind::Normal),
            Some('C') => Some(IndexKind::Cidr),
            Some('A') => Some(IndexKind::All),
            Some('R') => Some(IndexKind::Referral),
            _ => None,
        }
    }

    fn make_index(self) -> Index {
        match self {
            IndexKind::Normal => Index::String(StringIndex::new()),
            IndexKind::Cidr => Index::Cidr(CidrIndex::new()),
            IndexKind::All | IndexKind::Referral => Index::Combo(ComboIndex::new()),
        }
    }
}

/// An ordered, deduplicated list of object ids produced by a search.
///
/// Ids keep their first-seen order; a membership set backs the dedup.
#[derive(Debug, Default, Clone)]
pub struct IndexResult {
    ids: Vec<String>,
    seen: HashSet<String>,
}

impl IndexResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: Vec<String>) -> Self {
        let mut res = Self::new();
        res.extend(ids);
        res
    }

    pub fn push(&mut self, id: String) {
        if self.seen.insert(id.clone()) {
            self.ids.push(id);
        }
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = String>) {
        for id in ids {
            self.push(id);
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn truncate(&mut self, n: usize) {
        for id in &self.ids[n.min(self.ids.len())..] {
            self.seen.remove(id);
        }
        self.ids.truncate(n);
    }

    pub fn into_ids(self) -> Vec<String> {
        self.ids
    }
}

/// The in-memory directory database.
#[derive(Debug, Default)]
pub struct Store {
    /// id -> object
    main_index: HashMap<String, RwhoisObject>,
    /// attribute -> search index, for indexed attributes only
    indexes: HashMap<String, Index>,
    /// every seen attribute and how (whether) it is indexed
    attrs: HashMap<String, Option<IndexKind>>,
    /// attributes consulted by unconstrained string searches
    normal_indexes: Vec<String>,
    /// attributes consulted by unconstrained CIDR searches
    cidr_indexes: Vec<String>,
    classes: HashSet<String>,
    authareas: HashSet<String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the schema from `attr = type` lines (`#` comments and
    /// blank lines ignored). The baseline attributes `id`, `auth-area`,
    /// `class-name`, `updated` and `referred-auth-area` are always
    /// present; a schema line may override one. The last definition of
    /// an attribute wins.
    pub fn init_schema(&mut self, text: &str) -> Result<()> {
        let mut defs: Vec<(String, Option<IndexKind>)> = vec![
            ("id".to_string(), Some(IndexKind::Normal)),
            ("auth-area".to_string(), None),
            ("class-name".to_string(), None),
            ("updated".to_string(), None),
            ("referred-auth-area".to_string(), Some(IndexKind::Referral)),
        ];

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, kind_text) =
                line.split_once('=')
                    .ok_or_else(|| StoreError::InvalidSchemaLine {
                        line: idx + 1,
                        text: raw.to_string(),
                    })?;
            let attr = name.trim().to_lowercase();
            let kind_text = kind_text.trim();
            let kind =
                IndexKind::parse(kind_text).ok_or_else(|| StoreError::UnknownIndexType {
                    attr: attr.clone(),
                    kind: kind_text.to_string(),
                })?;
            defs.retain(|(existing, _)| existing != &attr);
            defs.push((attr, Some(kind)));
        }

        for (attr, kind) in defs {
            self.attrs.insert(attr.clone(), kind);
            let Some(kind) = kind else { continue };
            self.indexes.insert(attr.clone(), kind.make_index());
            match kind {
                IndexKind::Normal => self.normal_indexes.push(attr),
                IndexKind::Cidr => self.cidr_indexes.push(attr),
                IndexKind::All => {
                    self.normal_indexes.push(attr.clone());
                    self.cidr_indexes.push(attr);
                }
                IndexKind::Referral => {}
            }
        }
        Ok(())
    }

    /// Add an object to the main index and every applicable attribute
    /// index. Objects without an `id` are discarded. Returns whether the
    /// object was stored.
    pub fn add_object(&mut self, obj: RwhoisObject) -> bool {
        let Some(id) = obj.id() else {
            if !obj.is_empty() {
                tracing::debug!("discarding object without id");
            }
            return false;
        };
        let id = id.trim().to_lowercase();
        if id.is_empty() {
            return false;
        }

        for (attr, value) in obj.items() {
            // note the attribute, unindexed unless the schema says so
            self.attrs.entry(attr.to_string()).or_insert(None);
            let value_lc = value.to_lowercase();
            match attr {
                "auth-area" => {
                    self.authareas.insert(value_lc.clone());
                }
                "class-name" => {
                    self.classes.insert(value_lc.clone());
                }
                _ => {}
            }
            if let Some(index) = self.indexes.get_mut(attr) {
                if let Err(err) = index.add(&value_lc, &id) {
                    tracing::warn!("skipping unindexable {attr} value {value:?}: {err}");
                }
            }
        }

        self.main_index.insert(id, obj);
        true
    }

    /// Prepare every index for searching. Purely an optimization:
    /// lookups on unprepared indexes fall back to linear scans.
    pub fn index_data(&mut self) {
        for index in self.indexes.values_mut() {
            index.prepare();
        }
    }

    pub fn is_attribute(&self, attr: &str) -> bool {
        self.attrs.contains_key(&attr.trim().to_lowercase())
    }

    /// The index type of an attribute, `None` when unindexed or unknown.
    pub fn indexed_kind(&self, attr: &str) -> Option<IndexKind> {
        self.attrs
            .get(&attr.trim().to_lowercase())
            .copied()
            .flatten()
    }

    pub fn is_objectclass(&self, class: &str) -> bool {
        self.classes.contains(&class.trim().to_lowercase())
    }

    pub fn is_autharea(&self, auth_area: &str) -> bool {
        self.authareas.contains(&auth_area.trim().to_lowercase())
    }

    pub fn auth_areas(&self) -> impl Iterator<Item = &str> {
        self.authareas.iter().map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn object_count(&self) -> usize {
        self.main_index.len()
    }

    pub fn objects(&self) -> impl Iterator<Item = &RwhoisObject> {
        self.main_index.values()
    }

    /// Resolve ids into objects, dropping ids that no longer resolve.
    pub fn fetch_objects<'a>(
        &'a self,
        ids: impl IntoIterator<Item = &'a String> + 'a,
    ) -> impl Iterator<Item = &'a RwhoisObject> + 'a {
        ids.into_iter().filter_map(|id| self.main_index.get(id))
    }

    /// Search one attribute's index.
    ///
    /// Wildcards are canonicalised here: a trailing `**` with a CIDR
    /// value on a CIDR-capable index is a subnet search; a trailing `*`
    /// is a prefix search (all supernets for a CIDR value); exact
    /// otherwise. A CIDR index finds nothing for values that do not
    /// parse.
    pub fn search_attr(&self, attr: &str, value: &str, max: usize) -> IndexResult {
        let attr = attr.trim().to_lowercase();
        let Some(index) = self.indexes.get(&attr) else {
            return IndexResult::new();
        };

        let super_prefix = value.ends_with("**");
        let prefix = value.ends_with('*');
        let key = value.trim_end_matches('*').trim().to_lowercase();

        if super_prefix && index.supports_cidr() && valid_cidr(&key).is_some() {
            if let Some(values) = index.find_subnets(&key, max) {
                return IndexResult::from_ids(values);
            }
        }
        IndexResult::from_ids(index.find(&key, prefix, max))
    }

    /// Unconstrained search across the string-searchable indexes.
    pub fn search_normal(&self, value: &str, max: usize) -> IndexResult {
        self.search_across(&self.normal_indexes, value, max)
    }

    /// Unconstrained search across the CIDR-searchable indexes.
    pub fn search_cidr(&self, value: &str, max: usize) -> IndexResult {
        self.search_across(&self.cidr_indexes, value, max)
    }

    /// Explicit referral-index search.
    pub fn search_referral(&self, value: &str, max: usize) -> IndexResult {
        self.search_attr("referred-auth-area", value, max)
    }

    fn search_across(&self, attrs: &[String], value: &str, max: usize) -> IndexResult {
        let mut res = IndexResult::new();
        for attr in attrs {
            res.extend(self.search_attr(attr, value, max).into_ids());
            if max != 0 && res.len() >= max {
                res.truncate(max);
                return res;
            }
        }
        res
    }
}
