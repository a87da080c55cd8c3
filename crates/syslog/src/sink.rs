//! Sink: one downstream collector endpoint
//!
//! A sink owns a bounded message queue and a writer task. Producers hand
//! messages off with a non-blocking enqueue; when the queue is full the
//! message is dropped and counted, never blocking the caller. The writer
//! drains the queue, lazily (re)establishes the connection, writes each
//! framed message under a deadline, and keeps the sink's observable state
//! current: drop counter, last attempt, last success, last error.
//!
//! Failure policy: errors never propagate to producers and no message is
//! retried. A slow or dead collector costs its own messages, nothing else.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::connect::{ConnectError, Connection, Strategy, TlsSettings};
use crate::message::Message;
use crate::out::OutConfig;

/// Emit a queue-overflow warning every this many drops
const DROP_WARN_EVERY: u64 = 1000;

/// Static description of a sink, as configured.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkDescriptor {
    /// Collector endpoint, `host:port`
    pub addr: String,

    /// Display name for the state endpoint
    #[serde(default)]
    pub name: String,

    /// Kubernetes namespace this sink is bound to; empty for cluster sinks
    #[serde(default)]
    pub namespace: String,

    /// TLS settings; absent means plain TCP
    #[serde(default)]
    pub tls: Option<TlsSettings>,
}

/// The last failure observed on a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkError {
    pub msg: String,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time view of a sink's health, as served by the state endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkState {
    pub name: String,
    pub namespace: String,
    pub last_successful_send: DateTime<Utc>,
    pub error: Option<SinkError>,
}

/// Counters and the last-error slot, shared between the sink handle and
/// its writer task.
#[derive(Debug, Default)]
struct SinkStats {
    messages_dropped: AtomicU64,
    last_success_nanos: AtomicI64,
    last_attempt_nanos: AtomicI64,
    last_error: RwLock<Option<SinkError>>,
}

impl SinkStats {
    fn record_success(&self, now: DateTime<Utc>) {
        *self.last_error.write() = None;
        self.last_success_nanos
            .store(now.timestamp_nanos_opt().unwrap_or_default(), Ordering::Relaxed);
    }

    fn record_failure(&self, msg: String, now: DateTime<Utc>) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
        *self.last_error.write() = Some(SinkError {
            msg,
            timestamp: now,
        });
    }

    fn record_attempt(&self, now: DateTime<Utc>) {
        self.last_attempt_nanos
            .store(now.timestamp_nanos_opt().unwrap_or_default(), Ordering::Relaxed);
    }
}

/// A running sink: the producer-facing handle.
///
/// Dropping every handle closes the queue; the writer drains what is left
/// and exits. Queues are not flushed on shutdown, loss there is accepted.
pub struct Sink {
    addr: String,
    name: String,
    namespace: String,
    tx: mpsc::Sender<Arc<Message>>,
    stats: Arc<SinkStats>,
}

impl Sink {
    /// Start a sink: create its bounded queue and spawn the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn start(desc: SinkDescriptor, config: &OutConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.buffer_size);
        let stats = Arc::new(SinkStats::default());

        let writer = Writer {
            addr: desc.addr.clone(),
            strategy: Strategy::new(desc.tls.as_ref(), config.dial_timeout),
            write_timeout: config.write_timeout,
            sanitize_host: config.sanitize_host,
            conn: None,
            rx,
            stats: Arc::clone(&stats),
        };
        tokio::spawn(writer.run());

        Self {
            addr: desc.addr,
            name: desc.name,
            namespace: desc.namespace,
            tx,
            stats,
        }
    }

    /// Hand a message to the writer without blocking.
    ///
    /// When the queue is full the message is dropped, the drop counter
    /// advances, and every 1000th drop logs a warning naming this sink.
    pub fn enqueue(&self, msg: Arc<Message>) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                let dropped = self.stats.messages_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % DROP_WARN_EVERY == 0 {
                    tracing::warn!(
                        addr = %self.addr,
                        namespace = %self.namespace,
                        dropped,
                        "sink queue full, dropping messages"
                    );
                }
            }
        }
    }

    /// Snapshot the sink's observable state.
    pub fn state(&self) -> SinkState {
        SinkState {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            last_successful_send: DateTime::from_timestamp_nanos(
                self.stats.last_success_nanos.load(Ordering::Relaxed),
            ),
            error: self.stats.last_error.read().clone(),
        }
    }

    /// Total messages lost to a full queue or failed writes. Monotonic.
    pub fn messages_dropped(&self) -> u64 {
        self.stats.messages_dropped.load(Ordering::Relaxed)
    }

    /// Wall-clock time of the last write attempt, or `None` before the
    /// first attempt.
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        match self.stats.last_attempt_nanos.load(Ordering::Relaxed) {
            0 => None,
            nanos => Some(DateTime::from_timestamp_nanos(nanos)),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[derive(Debug, Error)]
enum WriteError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("write to {addr}: {source}")]
    Write {
        addr: String,
        source: std::io::Error,
    },

    #[error("write to {addr}: deadline exceeded")]
    DeadlineExceeded { addr: String },
}

/// The single consumer of a sink's queue. Owns the connection slot; no
/// other task touches it.
struct Writer {
    addr: String,
    strategy: Strategy,
    write_timeout: Duration,
    sanitize_host: bool,
    conn: Option<Connection>,
    rx: mpsc::Receiver<Arc<Message>>,
    stats: Arc<SinkStats>,
}

impl Writer {
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            self.write_one(&msg).await;
        }
        if let Some(mut conn) = self.conn.take() {
            conn.shutdown().await;
        }
    }

    async fn write_one(&mut self, msg: &Message) {
        match self.try_write(msg).await {
            Ok(()) => self.stats.record_success(Utc::now()),
            Err(e) => {
                tracing::debug!(addr = %self.addr, error = %e, "dropped message");
                self.stats.record_failure(e.to_string(), Utc::now());
            }
        }
        self.stats.record_attempt(Utc::now());
    }

    /// Write one framed message, dialing first if the connection slot is
    /// empty. On any failure the connection is closed and the slot left
    /// empty, so the next message starts with a fresh dial.
    async fn try_write(&mut self, msg: &Message) -> Result<(), WriteError> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.strategy.connect(&self.addr).await?,
        };

        let frame = msg.frame(self.sanitize_host);
        let result = {
            let write = async {
                conn.write_all(&frame).await?;
                conn.flush().await
            };
            tokio::pin!(write);

            // The deadline is polled first so a zero timeout fails every
            // write, matching the configured-deadline contract.
            tokio::select! {
                biased;
                () = tokio::time::sleep(self.write_timeout) => {
                    Err(WriteError::DeadlineExceeded {
                        addr: self.addr.clone(),
                    })
                }
                result = &mut write => result.map_err(|source| WriteError::Write {
                    addr: self.addr.clone(),
                    source,
                }),
            }
        };

        match result {
            Ok(()) => {
                self.conn = Some(conn);
                Ok(())
            }
            Err(e) => {
                conn.shutdown().await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod sink_test;
