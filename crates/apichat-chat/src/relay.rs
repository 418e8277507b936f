//! Streaming relay to an OpenAI-compatible chat completions endpoint.
//!
//! The upstream body is forwarded line by line without being parsed. Every
//! failure ends the stream with a single [`StreamEvent::Error`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ConfigStore;
use crate::error::RelayError;
use crate::types::{ApiConfig, StreamEvent};

/// Boxed stream returned by [`ChatRelay::relay`].
pub type RelayStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Passthrough lines previewed at debug level per call.
const LOGGED_LINES: usize = 2;

/// Events buffered between the upstream reader and the client.
const CHANNEL_CAPACITY: usize = 32;

/// Longest upstream line accepted before the call is failed.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Splits a byte stream into lines on `\n`, dropping a trailing `\r`.
///
/// Bytes are buffered until their terminator arrives, so multi-byte
/// characters split across chunks decode intact. Each byte is scanned for a
/// terminator only once.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no `\n`.
    scanned: usize,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return the non-empty lines it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if let Some(line) = decode_line(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
            from = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        lines
    }

    /// Bytes of the current unterminated line.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Flush an unterminated final line, if any.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(raw).into_owned())
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        out.push_str("...");
    }
    out
}

fn timed_out(timeout: Duration) -> RelayError {
    RelayError::Transport(format!(
        "upstream timed out after {}s",
        timeout.as_secs_f64()
    ))
}

/// Why a relay call stopped before reaching the end of the upstream body.
enum Halt {
    Failed(RelayError),
    ClientGone,
}

impl From<RelayError> for Halt {
    fn from(err: RelayError) -> Self {
        Halt::Failed(err)
    }
}

/// Await `fut` unless the client drops its end of the stream first.
async fn until_client_gone<F: Future>(
    tx: &mpsc::Sender<StreamEvent>,
    fut: F,
) -> Result<F::Output, Halt> {
    tokio::select! {
        biased;
        _ = tx.closed() => Err(Halt::ClientGone),
        out = fut => Ok(out),
    }
}

/// Everything one relay call needs, captured when the call starts.
struct RelayCall {
    client: Client,
    config: Arc<ApiConfig>,
    model: String,
    message: String,
    timeout: Duration,
    max_line_bytes: usize,
}

impl RelayCall {
    async fn run(self, tx: mpsc::Sender<StreamEvent>) {
        info!("USER: {}", preview(&self.message, 200));

        match self.forward(&tx).await {
            Ok(count) => info!("Done. Chunks: {}", count),
            Err(Halt::ClientGone) => info!("Client disconnected, upstream closed"),
            Err(Halt::Failed(err)) => {
                warn!("Relay failed: {}", err);
                let _ = tx.send(StreamEvent::Error(err)).await;
            }
        }
    }

    /// Pass upstream lines to `tx`. Returns the number of lines forwarded.
    async fn forward(&self, tx: &mpsc::Sender<StreamEvent>) -> Result<usize, Halt> {
        self.config
            .require_ready()
            .map_err(RelayError::NotConfigured)?;

        let url = self.config.completions_url();
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": self.message}],
            "stream": true,
        });

        debug!("API request to {} with model {}", url, self.model);

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        let response = until_client_gone(tx, tokio::time::timeout(self.timeout, request))
            .await?
            .map_err(|_| timed_out(self.timeout))?
            .map_err(|e| RelayError::transport(&e))?;

        let status = response.status();
        info!("Upstream status: {}", status.as_u16());

        if status != StatusCode::OK {
            let body = until_client_gone(tx, tokio::time::timeout(self.timeout, response.text()))
                .await?
                .map_err(|_| timed_out(self.timeout))?
                .map_err(|e| RelayError::transport(&e))?;
            return Err(RelayError::UpstreamStatus {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let mut stream = response.bytes_stream();
        let mut lines = LineSplitter::new();
        let mut count = 0usize;

        loop {
            let next = until_client_gone(tx, tokio::time::timeout(self.timeout, stream.next()))
                .await?
                .map_err(|_| timed_out(self.timeout))?;
            let chunk = match next {
                Some(chunk) => chunk.map_err(|e| RelayError::transport(&e))?,
                None => break,
            };

            for line in lines.push(&chunk) {
                count += 1;
                if count <= LOGGED_LINES {
                    debug!("chunk {}: {}", count, preview(&line, 80));
                }
                tx.send(StreamEvent::Line(line))
                    .await
                    .map_err(|_| Halt::ClientGone)?;
            }

            if lines.pending_len() > self.max_line_bytes {
                return Err(RelayError::LineTooLong {
                    limit: self.max_line_bytes,
                }
                .into());
            }
        }

        if let Some(line) = lines.finish() {
            count += 1;
            tx.send(StreamEvent::Line(line))
                .await
                .map_err(|_| Halt::ClientGone)?;
        }

        Ok(count)
    }
}

/// Relays one user message per call to the configured upstream.
pub struct ChatRelay {
    client: Client,
    store: Arc<ConfigStore>,
    model: String,
    timeout: Duration,
    max_line_bytes: usize,
}

impl ChatRelay {
    /// Create a relay with its own HTTP client.
    ///
    /// `timeout` bounds connecting, receiving the response head and every
    /// subsequent body read.
    pub fn new(
        store: Arc<ConfigStore>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            store,
            model: model.into(),
            timeout,
            max_line_bytes: MAX_LINE_BYTES,
        })
    }

    /// Relay `message` upstream and stream back what arrives.
    ///
    /// The config snapshot is taken here, so a concurrent update does not
    /// affect a call already started. The upstream is read by a task spawned
    /// on the current Tokio runtime inside a `relay` span carrying a request
    /// id. Dropping the stream ends that task and closes the upstream
    /// connection.
    pub fn relay(&self, message: String) -> RelayStream {
        let call = RelayCall {
            client: self.client.clone(),
            config: self.store.read(),
            model: self.model.clone(),
            message,
            timeout: self.timeout,
            max_line_bytes: self.max_line_bytes,
        };

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let span = info_span!("relay", request_id = %Uuid::new_v4());
        tokio::spawn(call.run(tx).instrument(span));

        Box::pin(ReceiverStream::new(rx))
    }
}
