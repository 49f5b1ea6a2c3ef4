//! Flat-file schema and data loading.
//!
//! Schema files hold `attr = type` lines. Data files hold records of
//! `attr:value` lines separated by a bare `---` line; `#` starts a
//! comment in both. EOF finalises an in-progress record.

use crate::{Result, Store};
use rwhois_core::RwhoisObject;
use std::fs;
use std::path::Path;

/// Read a schema file into the store.
pub fn load_schema(store: &mut Store, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    store.init_schema(&text)?;
    tracing::info!("loaded schema from {}", path.display());
    Ok(())
}

/// Read one rwhoisd-style data file into the store.
pub fn load_data(store: &mut Store, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let loaded = parse_data(store, &text);
    tracing::info!("loaded {loaded} objects from {}", path.display());
    Ok(())
}

/// Parse data-file text into the store; returns the number of objects
/// stored.
pub fn parse_data(store: &mut Store, text: &str) -> usize {
    let mut loaded = 0;
    let mut obj = RwhoisObject::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.starts_with('#') {
            continue;
        }
        if line.is_empty() || line.starts_with("---") {
            // end of record
            if store.add_object(std::mem::take(&mut obj)) {
                loaded += 1;
            }
            continue;
        }
        match line.split_once(':') {
            Some((attr, value)) => obj.add_attr(attr, value.trim_start()),
            None => tracing::warn!("skipping malformed data line: {line:?}"),
        }
    }

    if store.add_object(obj) {
        loaded += 1;
    }
    loaded
}
