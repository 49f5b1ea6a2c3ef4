//! Core types for the RWhois server
//!
//! This crate provides the pieces every other layer speaks in terms of:
//! - [`RwhoisObject`] - an attribute/value directory record
//! - The RWhois numeric response codes and `%ok`/`%error` wire framing
//!
//! # Examples
//!
//! ```
//! use rwhois_core::{error_line, ok};
//!
//! assert_eq!(ok(), "%ok\r\n");
//! assert_eq!(
//!     error_line(230, None),
//!     "%error 230 No Objects Found\r\n"
//! );
//! ```

pub mod object;

pub use object::RwhoisObject;

/// Human text for an RWhois response code. Most of these are never
/// produced by a read-only server but the table is the full protocol
/// set.
pub fn code_text(code: u16) -> Option<&'static str> {
    let text = match code {
        120 => "Registration Deferred",
        130 => "Object Not Authoritative",
        230 => "No Objects Found",
        320 => "Invalid Attribute",
        321 => "Invalid Attribute Syntax",
        322 => "Required Attribute Missing",
        323 => "Object Reference Not Found",
        324 => "Primary Key Not Unique",
        325 => "Failed to Update Stale Object",
        330 => "Exceeded Response Limit",
        331 => "Invalid Limit",
        332 => "Nothing To Transfer",
        333 => "Not Master for Authority Area",
        336 => "Object Not Found",
        338 => "Invalid Directive Syntax",
        340 => "Invalid Authority Area",
        341 => "Invalid Class",
        342 => "Invalid Host/Port",
        350 => "Invalid Query Syntax",
        351 => "Query Too Complex",
        352 => "Invalid Security Method",
        353 => "Authentication Failed",
        354 => "Encryption Failed",
        360 => "Corrupt Data. Keyadd Failed",
        400 => "Directive Not Available",
        401 => "Not Authorized For Directive",
        402 => "Unidentified Error",
        420 => "Registration Not Authorized",
        436 => "Invalid Display Format",
        500 => "Memory Allocation Problem",
        501 => "Service Not Available",
        502 => "Unrecoverable Error",
        503 => "Idle Time Exceeded",
        560 => "",
        _ => return None,
    };
    Some(text)
}

/// Format a `%error` response line, CRLF terminated. Codes outside the
/// protocol table degrade to 402.
pub fn error_line(code: u16, detail: Option<&str>) -> String {
    let (code, text) = match code_text(code) {
        Some(text) => (code, text),
        None => (402, "Unidentified Error"),
    };
    match detail {
        Some(detail) => format!("%error {code} {text}: {detail}\r\n"),
        None => format!("%error {code} {text}\r\n"),
    }
}

/// The `%ok` terminator line, CRLF terminated.
pub fn ok() -> &'static str {
    "%ok\r\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_text() {
        assert_eq!(code_text(230), Some("No Objects Found"));
        assert_eq!(code_text(350), Some("Invalid Query Syntax"));
        assert_eq!(code_text(999), None);
    }

    #[test]
    fn test_error_line() {
        assert_eq!(error_line(330, None), "%error 330 Exceeded Response Limit\r\n");
        assert_eq!(
            error_line(340, Some("a.com")),
            "%error 340 Invalid Authority Area: a.com\r\n"
        );
    }

    #[test]
    fn test_error_line_unknown_code() {
        assert_eq!(error_line(777, None), "%error 402 Unidentified Error\r\n");
        assert_eq!(
            error_line(777, Some("what")),
            "%error 402 Unidentified Error: what\r\n"
        );
    }

    #[test]
    fn test_ok() {
        assert_eq!(ok(), "%ok\r\n");
    }
}
