//! The RWhois data object: an ordered attribute/value multimap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A directory record.
///
/// Attribute names are lower-cased and trimmed on insertion; an
/// attribute may carry several values. Iteration follows the order in
/// which attribute names first appeared, with all values of an
/// attribute emitted consecutively.
///
/// # Examples
///
/// ```
/// use rwhois_core::RwhoisObject;
///
/// let mut obj = RwhoisObject::new();
/// obj.add_attr("ID", "001");
/// obj.add_attr("class-name", "contact");
/// obj.add_attr("email", "aquin@yahoo.com");
/// obj.add_attr("email", "aq@aol.net");
///
/// assert_eq!(obj.id(), Some("001"));
/// assert_eq!(obj.get_attr("email").len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwhoisObject {
    data: HashMap<String, Vec<String>>,
    attr_order: Vec<String>,
}

fn normalize(attr: &str) -> String {
    attr.trim().to_lowercase()
}

impl RwhoisObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `attr`, recording the attribute's position
    /// on first appearance.
    pub fn add_attr(&mut self, attr: &str, value: impl Into<String>) {
        let attr = normalize(attr);
        let values = self.data.entry(attr.clone()).or_default();
        if values.is_empty() {
            self.attr_order.push(attr);
        }
        values.push(value.into());
    }

    /// All values of an attribute; empty if the attribute is absent.
    pub fn get_attr(&self, attr: &str) -> &[String] {
        self.data
            .get(&normalize(attr))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of an attribute.
    pub fn get_attr_value(&self, attr: &str) -> Option<&str> {
        self.get_attr(attr).first().map(String::as_str)
    }

    pub fn has_attr(&self, attr: &str) -> bool {
        self.data.contains_key(&normalize(attr))
    }

    /// The RWhois ID of this object.
    pub fn id(&self) -> Option<&str> {
        self.get_attr_value("id")
    }

    /// The object class, `"unknown-class"` when unset.
    pub fn class_name(&self) -> &str {
        self.get_attr_value("class-name").unwrap_or("unknown-class")
    }

    /// `(attribute, value)` pairs in first-insertion attribute order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attr_order.iter().flat_map(move |attr| {
            self.data
                .get(attr)
                .into_iter()
                .flatten()
                .map(move |value| (attr.as_str(), value.as_str()))
        })
    }

    /// Every value in the object, across all attributes.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.items().map(|(_, value)| value)
    }

    /// Attribute names in first-insertion order.
    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attr_order.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.attr_order.is_empty()
    }

    /// Wire-format the named attributes, one `class:attr:value` line per
    /// value, CRLF between lines (no trailing CRLF). `prefix` is
    /// prepended to every line; attributes the object lacks are skipped.
    pub fn attrs_to_wire_str<'a>(
        &self,
        attrs: impl IntoIterator<Item = &'a str>,
        prefix: &str,
    ) -> String {
        let class_name = self.class_name();
        let mut lines = Vec::new();
        for attr in attrs {
            let attr = normalize(attr);
            if let Some(values) = self.data.get(&attr) {
                for value in values {
                    lines.push(format!("{prefix}{class_name}:{attr}:{value}"));
                }
            }
        }
        lines.join("\r\n")
    }

    /// Wire-format the whole object.
    pub fn to_wire_str(&self, prefix: &str) -> String {
        self.attrs_to_wire_str(self.attr_order.iter().map(String::as_str), prefix)
    }
}

impl fmt::Display for RwhoisObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .items()
            .map(|(attr, value)| format!("{attr}:{value}"))
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}
