//! TCP accept loop and per-connection line protocol.

use crate::config::ServerConfig;
use crate::directive::DirectiveProcessor;
use crate::session::{handle_query, SessionContext};
use rwhois_query::QueryProcessor;
use rwhois_store::Store;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Longest request the server will look at; the rest of an overlong
/// line is discarded.
pub const MAX_REQUEST_LEN: usize = 1024;

/// The RWhois TCP service: one tokio task per connection over a shared,
/// read-only store.
pub struct RwhoisServer {
    store: Arc<Store>,
    config: Arc<ServerConfig>,
}

impl RwhoisServer {
    pub fn new(store: Arc<Store>, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Bind the configured address and serve until the process ends.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener).await
    }

    /// Serve connections from an existing listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        tracing::info!("listening on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await?;
            let store = Arc::clone(&self.store);
            let config = Arc::clone(&self.config);
            tokio::spawn(async move {
                tracing::debug!("accepted connection from {peer}");
                if let Err(err) = handle_connection(store, config, stream).await {
                    tracing::debug!("connection from {peer} ended with error: {err}");
                }
                tracing::debug!("done with {peer}");
            });
        }
    }
}

async fn handle_connection(
    store: Arc<Store>,
    config: Arc<ServerConfig>,
    stream: TcpStream,
) -> std::io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    writer.write_all(config.banner_string().as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;

    let mut session = SessionContext::new(&config);
    let query_processor = QueryProcessor::new(Arc::clone(&store));
    let directive_processor = DirectiveProcessor::new(store, config);

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            // peer closed
            break;
        }
        let request = clip_request(line.trim());
        if request.is_empty() {
            continue;
        }
        tracing::trace!("request: {request}");

        let response = if request.starts_with('-') {
            directive_processor.process(&mut session, request)
        } else {
            let response = handle_query(&query_processor, &session, request);
            if !session.hold_connect {
                session.quit = true;
            }
            response
        };

        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;

        if session.quit {
            break;
        }
    }
    Ok(())
}

// Cap a request at MAX_REQUEST_LEN bytes without splitting a character.
fn clip_request(line: &str) -> &str {
    if line.len() <= MAX_REQUEST_LEN {
        return line;
    }
    let mut end = MAX_REQUEST_LEN;
    while end > 0 && !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_request_short() {
        assert_eq!(clip_request("a.com"), "a.com");
    }

    #[test]
    fn test_clip_request_long() {
        let long = "x".repeat(MAX_REQUEST_LEN + 100);
        assert_eq!(clip_request(&long).len(), MAX_REQUEST_LEN);
    }

    #[test]
    fn test_clip_request_char_boundary() {
        // é is two bytes; an odd cap position must back up to a boundary
        let long = "é".repeat(MAX_REQUEST_LEN / 2 + 10);
        let clipped = clip_request(&long);
        assert!(clipped.len() <= MAX_REQUEST_LEN);
        assert!(long.starts_with(clipped));
    }
}
