//! Record routing
//!
//! `Out` is the forwarding engine's front door: it converts each record
//! into a syslog message once, then fans the shared message out to every
//! cluster sink and to the sinks bound to the record's namespace. The
//! routing table is immutable after construction, so the write path takes
//! no locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::message::build;
use crate::record::Value;
use crate::sink::{Sink, SinkDescriptor, SinkState};

/// Global sink defaults.
#[derive(Debug, Clone)]
pub struct OutConfig {
    /// Bound on one connection attempt (TCP dial plus TLS handshake)
    pub dial_timeout: Duration,

    /// Bound on writing one framed message
    pub write_timeout: Duration,

    /// Capacity of each sink's pending-message queue
    pub buffer_size: usize,

    /// Normalize hostnames to `[A-Za-z0-9.-]` before rendering
    pub sanitize_host: bool,
}

impl Default for OutConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(1),
            buffer_size: 10_000,
            sanitize_host: true,
        }
    }
}

impl OutConfig {
    #[must_use]
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    #[must_use]
    pub fn with_sanitize_host(mut self, sanitize: bool) -> Self {
        self.sanitize_host = sanitize;
        self
    }
}

/// Routes records to syslog sinks by Kubernetes namespace.
pub struct Out {
    sinks: HashMap<String, Vec<Sink>>,
    cluster_sinks: Vec<Sink>,
}

impl Out {
    /// Build the routing table and start every sink's writer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        sinks: Vec<SinkDescriptor>,
        cluster_sinks: Vec<SinkDescriptor>,
        config: OutConfig,
    ) -> Self {
        let mut table: HashMap<String, Vec<Sink>> = HashMap::new();
        for desc in sinks {
            let sink = Sink::start(desc, &config);
            table
                .entry(sink.namespace().to_string())
                .or_default()
                .push(sink);
        }

        let cluster_sinks: Vec<Sink> = cluster_sinks
            .into_iter()
            .map(|mut desc| {
                // Cluster sinks receive everything; a configured namespace
                // is meaningless and dropped.
                desc.namespace = String::new();
                Sink::start(desc, &config)
            })
            .collect();

        tracing::info!(
            namespaces = table.len(),
            cluster_sinks = cluster_sinks.len(),
            "syslog output ready"
        );

        Self {
            sinks: table,
            cluster_sinks,
        }
    }

    /// Convert one record and enqueue it on every matching sink.
    ///
    /// Every cluster sink receives every record, with or without
    /// Kubernetes metadata. Namespace sinks receive records whose
    /// namespace matches; a namespace with no sinks drops silently.
    /// Never blocks.
    pub fn write(&self, record: &Value, timestamp: DateTime<Utc>, tag: &str) {
        let (msg, namespace) = build(record, timestamp, tag);
        let msg = Arc::new(msg);

        for sink in &self.cluster_sinks {
            sink.enqueue(Arc::clone(&msg));
        }

        if let Some(sinks) = self.sinks.get(&namespace) {
            for sink in sinks {
                sink.enqueue(Arc::clone(&msg));
            }
        }
    }

    /// Snapshot the state of every sink: namespace-bound sinks first (map
    /// order), then cluster sinks in configuration order.
    pub fn sink_states(&self) -> Vec<SinkState> {
        let mut states = Vec::new();
        for sinks in self.sinks.values() {
            states.extend(sinks.iter().map(Sink::state));
        }
        states.extend(self.cluster_sinks.iter().map(Sink::state));
        states
    }
}

#[cfg(test)]
#[path = "out_test.rs"]
mod out_test;
