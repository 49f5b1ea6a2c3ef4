//! Per-connection session state and query response assembly.

use crate::config::ServerConfig;
use rwhois_core::{error_line, ok};
use rwhois_query::{parse, QueryProcessor};

/// Mutable per-connection state. Each connection gets its own; nothing
/// here is shared.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Response limit; 0 means unlimited
    pub limit: u32,
    /// Keep the connection open after a query response
    pub hold_connect: bool,
    /// Close after flushing the current response
    pub quit: bool,
}

impl SessionContext {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            limit: config.default_limit,
            hold_connect: false,
            quit: false,
        }
    }
}

/// Run one query line and build the complete response text.
///
/// Object lines (at most `limit` when a limit is set), then referral
/// lines, then the terminator: `%error 330` when the result set
/// overflowed the limit, `%error 230` when nothing matched, an `%error`
/// for parse/planning failures, `%ok` otherwise.
pub fn handle_query(processor: &QueryProcessor, session: &SessionContext, line: &str) -> String {
    let query = match parse(processor.store(), line) {
        Ok(query) => query,
        Err(err) => return error_line(err.code(), err.detail()),
    };

    // fetch one extra object so overflow is observable
    let max = if session.limit > 0 {
        session.limit as usize + 1
    } else {
        0
    };
    let result = match processor.process(&query, max) {
        Ok(result) => result,
        Err(err) => return error_line(err.code(), err.detail()),
    };

    if result.is_empty() {
        return error_line(230, None);
    }

    let limit = session.limit as usize;
    let shown = if limit > 0 { limit } else { usize::MAX };
    let mut out = String::new();
    for obj in result.objects().iter().take(shown) {
        out.push_str(&obj.to_wire_str(""));
        out.push_str("\r\n");
    }
    for referral in result.referrals() {
        out.push_str(referral);
        out.push_str("\r\n");
    }
    if limit > 0 && result.objects().len() > limit {
        out.push_str(&error_line(330, None));
    } else {
        out.push_str(ok());
    }
    out
}
