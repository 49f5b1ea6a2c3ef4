//! Query execution: indexed search, residual filtering, referral
//! chasing.

use crate::parser::{Op, Query, Term};
use crate::QueryError;
use regex::Regex;
use rwhois_cidr::valid_cidr;
use rwhois_core::RwhoisObject;
use rwhois_store::{IndexResult, Store};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9-]+\.[a-z0-9-.]+$").expect("domain pattern compiles")
});

/// The objects and referral URLs a query produced.
///
/// Objects are deduplicated by id, first seen wins; referrals are
/// concatenated in clause order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryResult {
    objects: Vec<RwhoisObject>,
    seen: HashSet<String>,
    referrals: Vec<String>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_object(&mut self, obj: &RwhoisObject) {
        let Some(id) = obj.id() else { return };
        let id = id.to_lowercase();
        if self.seen.insert(id) {
            self.objects.push(obj.clone());
        }
    }

    pub fn add_referrals(&mut self, referrals: impl IntoIterator<Item = String>) {
        self.referrals.extend(referrals);
    }

    pub fn extend(&mut self, other: QueryResult) {
        for obj in &other.objects {
            self.push_object(obj);
        }
        self.referrals.extend(other.referrals);
    }

    pub fn objects(&self) -> &[RwhoisObject] {
        &self.objects
    }

    pub fn referrals(&self) -> &[String] {
        &self.referrals
    }

    /// Number of result objects (referrals do not count).
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.referrals.is_empty()
    }

    /// Cap the object list at `n`; referrals are left alone.
    pub fn truncate(&mut self, n: usize) {
        for obj in &self.objects[n.min(self.objects.len())..] {
            if let Some(id) = obj.id() {
                self.seen.remove(&id.to_lowercase());
            }
        }
        self.objects.truncate(n);
    }
}

/// Executes parsed queries against a shared store.
#[derive(Debug, Clone)]
pub struct QueryProcessor {
    store: Arc<Store>,
}

impl QueryProcessor {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run a full query: every clause searched, objects unioned by id,
    /// referrals concatenated. `max` (0 = unlimited) caps the object
    /// union; callers pass `limit + 1` to detect overflow.
    pub fn process(&self, query: &Query, max: usize) -> Result<QueryResult, QueryError> {
        let mut result = QueryResult::new();
        for clause in query.prepared_clauses() {
            result.extend(self.process_clause(&clause, max)?);
            if max != 0 && result.len() >= max {
                result.truncate(max);
                break;
            }
        }
        Ok(result)
    }

    /// Run one AND-clause: search the first indexable term, filter the
    /// candidates with the rest, then chase referrals for the clause.
    fn process_clause(&self, clause: &[Term], max: usize) -> Result<QueryResult, QueryError> {
        let indexable = clause.iter().position(|term| {
            term.op == Op::Eq
                && match &term.attr {
                    None => true,
                    Some(attr) => self.store.indexed_kind(attr).is_some(),
                }
        });
        let Some(picked) = indexable else {
            return Err(QueryError::TooComplex);
        };

        let term = &clause[picked];
        let ids = self.search_term(term, max);

        let mut result = QueryResult::new();
        for obj in self.store.fetch_objects(ids.ids()) {
            let residual_match = clause
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != picked)
                .all(|(_, term)| filter_term(obj, term));
            if residual_match {
                result.push_object(obj);
            }
        }
        result.add_referrals(self.chase_referrals(clause));
        Ok(result)
    }

    fn search_term(&self, term: &Term, max: usize) -> IndexResult {
        match &term.attr {
            Some(attr) => self.store.search_attr(attr, &term.value, max),
            None => {
                if valid_cidr(term.value.trim_matches('*')).is_some() {
                    self.store.search_cidr(&term.value, max)
                } else {
                    self.store.search_normal(&term.value, max)
                }
            }
        }
    }

    /// Referral URLs for values that fall under a delegated namespace.
    ///
    /// A CIDR value is chased when it sits inside a CIDR-shaped
    /// authority area; a domain-shaped value is walked upward one label
    /// at a time while it sits under a domain-shaped authority area.
    /// Clauses that already target the referral index are skipped.
    fn chase_referrals(&self, clause: &[Term]) -> Vec<String> {
        for term in clause {
            if let Some(attr) = &term.attr {
                if attr == "referred-auth-area" {
                    return Vec::new();
                }
                if attr == "class-name"
                    && term.op == Op::Eq
                    && term.value.eq_ignore_ascii_case("referral")
                {
                    return Vec::new();
                }
            }
        }

        let mut ids = IndexResult::new();
        for term in clause {
            if term.op != Op::Eq {
                continue;
            }
            let value = term.value.trim_matches('*').to_lowercase();
            if let Some(cidr) = valid_cidr(&value) {
                let delegated = self.store.auth_areas().any(|area| {
                    valid_cidr(area).is_some_and(|area_cidr| cidr.is_subnet(&area_cidr))
                });
                if delegated {
                    ids.extend(self.store.search_referral(&value, 0).into_ids());
                }
            } else if DOMAIN_RE.is_match(&value) {
                let under_domain_area = self.store.auth_areas().any(|area| {
                    valid_cidr(area).is_none()
                        && (value == area || value.ends_with(&format!(".{area}")))
                });
                if under_domain_area {
                    let mut name = value.clone();
                    while !name.is_empty() {
                        let found = self.store.search_referral(&name, 0);
                        if !found.is_empty() {
                            ids.extend(found.into_ids());
                            break;
                        }
                        name = match name.split_once('.') {
                            Some((_, parent)) => parent.to_string(),
                            None => String::new(),
                        };
                    }
                }
            }
        }

        let mut referrals = Vec::new();
        for obj in self.store.fetch_objects(ids.ids()) {
            referrals.extend(obj.get_attr("referral").iter().cloned());
        }
        referrals
    }
}

// Does the object satisfy one residual term?
fn filter_term(obj: &RwhoisObject, term: &Term) -> bool {
    match &term.attr {
        Some(attr) => {
            let matched = obj
                .get_attr(attr)
                .iter()
                .any(|value| match_value(&term.value, value));
            if term.op == Op::Neq {
                !matched
            } else {
                matched
            }
        }
        None => obj.values().any(|value| match_value(&term.value, value)),
    }
}

/// Match a search value against a data value.
///
/// When both sides parse as CIDR blocks (ignoring trailing wildcards on
/// the search side) the CIDR rules apply: `sv**` is a subnet test,
/// `sv*` a supernet test, plain `sv` numeric equality. Otherwise both
/// sides are lowercased and compared with string semantics: `*x*`
/// substring, `*x` suffix, `x*` prefix, `x` equality.
pub fn match_value(searchval: &str, value: &str) -> bool {
    if let Some(cidr_result) = match_cidr(searchval, value) {
        return cidr_result;
    }

    let searchval = searchval.to_lowercase();
    let value = value.to_lowercase();

    if searchval.starts_with('*') && searchval.ends_with('*') && searchval.len() >= 2 {
        value.contains(searchval.trim_matches('*'))
    } else if searchval.starts_with('*') {
        value.ends_with(searchval.trim_start_matches('*'))
    } else if searchval.ends_with('*') {
        value.starts_with(searchval.trim_end_matches('*'))
    } else {
        searchval == value
    }
}

fn match_cidr(searchval: &str, value: &str) -> Option<bool> {
    let sv = valid_cidr(searchval.trim_end_matches('*'))?;
    let rv = valid_cidr(value)?;
    Some(if searchval.ends_with("**") {
        rv.is_subnet(&sv)
    } else if searchval.ends_with('*') {
        rv.is_supernet(&sv)
    } else {
        rv == sv
    })
}
