//! RWhois query language: parsing and execution
//!
//! A query is a disjunction of AND-clauses over `attr=value` /
//! `attr!=value` / bare-value terms, optionally opened by an object
//! class restriction:
//!
//! ```text
//! network ip-network=10.0.0.0/24** and updated!=19961022
//! domain-name=*.com or a.com
//! ```
//!
//! [`parse`] builds a [`Query`] against a [`Store`]'s known classes and
//! attributes; [`QueryProcessor`] executes it by searching one indexed
//! term per clause, filtering with the remainder, and chasing referrals
//! for values that fall under a delegated authority area.
//!
//! # Examples
//!
//! ```
//! use rwhois_core::RwhoisObject;
//! use rwhois_query::{parse, QueryProcessor};
//! use rwhois_store::Store;
//! use std::sync::Arc;
//!
//! let mut store = Store::new();
//! store.init_schema("domain-name = N\n").unwrap();
//! let mut obj = RwhoisObject::new();
//! obj.add_attr("id", "1");
//! obj.add_attr("class-name", "domain");
//! obj.add_attr("domain-name", "a.com");
//! store.add_object(obj);
//! store.index_data();
//!
//! let store = Arc::new(store);
//! let query = parse(&store, "domain-name=a.com").unwrap();
//! let result = QueryProcessor::new(Arc::clone(&store))
//!     .process(&query, 0)
//!     .unwrap();
//! assert_eq!(result.objects().len(), 1);
//! ```

use thiserror::Error;

mod parser;
mod processor;

pub use parser::{parse, Op, Query, Term};
pub use processor::{match_value, QueryProcessor, QueryResult};

/// Query errors, carrying their RWhois response code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query text did not parse (code 350)
    #[error("invalid query syntax")]
    Syntax,

    /// A clause has no term an index can answer (code 351)
    #[error("no indexed terms in query clause")]
    TooComplex,
}

impl QueryError {
    /// The RWhois response code for this error.
    pub fn code(&self) -> u16 {
        match self {
            QueryError::Syntax => 350,
            QueryError::TooComplex => 351,
        }
    }

    /// Detail text for the `%error` line, if any.
    pub fn detail(&self) -> Option<&'static str> {
        match self {
            QueryError::Syntax => None,
            QueryError::TooComplex => Some("No indexed terms in query clause"),
        }
    }
}
