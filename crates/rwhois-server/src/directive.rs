//! Server directive handling (`-rwhois`, `-limit`, `-xfer`, ...).

use crate::config::ServerConfig;
use crate::session::SessionContext;
use regex::Regex;
use rwhois_core::{error_line, ok};
use rwhois_store::Store;
use std::sync::{Arc, LazyLock};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^V-(\d+\.\d+)").expect("version pattern compiles"));

/// Known directives with their descriptions, sorted by name for the
/// `-directive` listing.
const DIRECTIVES: &[(&str, &str)] = &[
    ("directive", "Directive directive"),
    ("holdconnect", "Holdconnect directive"),
    ("limit", "Limit directive"),
    ("quit", "Quit directive"),
    ("rwhois", "Rwhois directive"),
    ("status", "Status directive"),
    ("xfer", "Xfer directive"),
];

fn description_of(name: &str) -> Option<&'static str> {
    DIRECTIVES
        .iter()
        .find(|(dir, _)| *dir == name)
        .map(|(_, desc)| *desc)
}

/// Handles `-` prefixed request lines. Stateless apart from the session
/// it is handed; shared safely across connections.
#[derive(Debug, Clone)]
pub struct DirectiveProcessor {
    store: Arc<Store>,
    config: Arc<ServerConfig>,
}

impl DirectiveProcessor {
    pub fn new(store: Arc<Store>, config: Arc<ServerConfig>) -> Self {
        Self { store, config }
    }

    /// Run one directive line and return the complete response text.
    pub fn process(&self, session: &mut SessionContext, line: &str) -> String {
        let stripped = line.trim_start_matches('-');
        let mut words = stripped.split_whitespace();
        let Some(name) = words.next() else {
            return error_line(400, None);
        };
        let args: Vec<&str> = words.collect();

        match name {
            "rwhois" => self.rwhois_directive(&args),
            "limit" => self.limit_directive(session, &args),
            "holdconnect" => self.hold_directive(session, &args),
            "directive" => self.directive_directive(&args),
            "xfer" => self.xfer_directive(&args),
            "status" => self.status_directive(session),
            "quit" => {
                session.quit = true;
                ok().to_string()
            }
            _ => error_line(400, None),
        }
    }

    // Client announces its protocol version; answer with the banner.
    // The version itself is not enforced.
    fn rwhois_directive(&self, args: &[&str]) -> String {
        let Some(version) = args.first() else {
            return error_line(338, None);
        };
        if !VERSION_RE.is_match(&version.to_uppercase()) {
            return error_line(338, None);
        }
        format!("{}\r\n", self.config.banner_string())
    }

    fn limit_directive(&self, session: &mut SessionContext, args: &[&str]) -> String {
        let requested: i64 = match args.first().map(|arg| arg.parse()) {
            Some(Ok(value)) => value,
            _ => return error_line(338, None),
        };
        session.limit = self.config.clamp_limit(requested);
        ok().to_string()
    }

    fn hold_directive(&self, session: &mut SessionContext, args: &[&str]) -> String {
        match args.first().map(|arg| arg.to_lowercase()).as_deref() {
            Some("on") => session.hold_connect = true,
            Some("off") => session.hold_connect = false,
            _ => return error_line(338, None),
        }
        ok().to_string()
    }

    fn directive_directive(&self, args: &[&str]) -> String {
        let mut out = String::new();
        match args.first() {
            None => {
                for (name, desc) in DIRECTIVES {
                    out.push_str(&format!("%directive directive:{name}\r\n"));
                    out.push_str(&format!("%directive description:{desc}\r\n"));
                }
            }
            Some(name) => match description_of(name) {
                Some(desc) => {
                    out.push_str(&format!("%directive directive:{name}\r\n"));
                    out.push_str(&format!("%directive description:{desc}\r\n"));
                }
                None => return error_line(400, None),
            },
        }
        out.push_str(ok());
        out
    }

    fn status_directive(&self, session: &SessionContext) -> String {
        let hold = if session.hold_connect { "on" } else { "off" };
        format!(
            "%status limit: {}\r\n\
             %status holdconnect: {hold}\r\n\
             %status forward: off\r\n\
             %status objects: {}\r\n\
             %status display: dump\r\n\
             %status contact: N/A\r\n\
             {}",
            session.limit,
            self.store.object_count(),
            ok()
        )
    }

    // Stream every object of an authority area, optionally restricted
    // by class and attribute list.
    fn xfer_directive(&self, args: &[&str]) -> String {
        let Some(auth_area) = args.first() else {
            return error_line(338, None);
        };
        let auth_area = auth_area.to_lowercase();

        let mut class: Option<String> = None;
        let mut attrs: Vec<String> = Vec::new();
        for arg in &args[1..] {
            if let Some(value) = arg.strip_prefix("class=") {
                if !value.is_empty() {
                    class = Some(value.to_lowercase());
                }
            } else if let Some(value) = arg.strip_prefix("attribute=") {
                if !value.is_empty() {
                    attrs.push(value.to_lowercase());
                }
            }
        }

        if !self.store.is_autharea(&auth_area) {
            return error_line(340, Some(&auth_area));
        }
        if let Some(class) = &class {
            if !self.store.is_objectclass(class) {
                return error_line(341, Some(class));
            }
        }
        for attr in &attrs {
            if !self.store.is_attribute(attr) {
                return error_line(342, Some(attr));
            }
        }

        let mut out = String::new();
        for obj in self.store.objects() {
            let in_area = obj
                .get_attr_value("auth-area")
                .is_some_and(|value| value.eq_ignore_ascii_case(&auth_area));
            if !in_area {
                continue;
            }
            if let Some(class) = &class {
                let in_class = obj
                    .get_attr_value("class-name")
                    .is_some_and(|value| value.eq_ignore_ascii_case(class));
                if !in_class {
                    continue;
                }
            }
            if attrs.is_empty() {
                out.push_str(&obj.to_wire_str("%xfer "));
            } else {
                out.push_str(&obj.attrs_to_wire_str(attrs.iter().map(String::as_str), "%xfer "));
            }
            out.push_str("\r\n%xfer \r\n");
        }
        out.push_str(ok());
        out
    }
}
