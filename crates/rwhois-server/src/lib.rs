//! TCP server, session handling and directives for the RWhois service
//!
//! One tokio task per accepted connection runs the line loop: banner,
//! then CRLF-terminated requests routed to either the directive
//! processor (`-` lines) or the query pipeline. The store is shared
//! immutably behind an [`Arc`](std::sync::Arc); session state (response
//! limit, hold-connect, quit flag) is per connection.
//!
//! # Examples
//!
//! ```no_run
//! use rwhois_server::{RwhoisServer, ServerConfig};
//! use rwhois_store::Store;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = Store::new();
//! store.init_schema("domain-name = N\n")?;
//! store.index_data();
//!
//! let server = RwhoisServer::new(Arc::new(store), ServerConfig::default());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod directive;
pub mod server;
pub mod session;

pub use config::{ConfigError, ServerConfig};
pub use directive::DirectiveProcessor;
pub use server::{RwhoisServer, ServerError};
pub use session::SessionContext;
