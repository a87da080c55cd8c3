//! Logdrain - Syslog forwarding core
//!
//! Converts Kubernetes log records into RFC 5424 syslog messages and
//! forwards them, framed with RFC 6587 octet counting, over TCP or TLS to
//! downstream collectors.
//!
//! # Architecture
//!
//! ```text
//! [records] --> [Out] --build--> (Message, namespace)
//!                 |
//!                 +--> [cluster Sink queue] --> [writer task] --> collector
//!                 +--> [namespace Sink queues] --> [writer tasks] --> collectors
//! ```
//!
//! Each sink owns a bounded queue and a writer task. Enqueueing never
//! blocks: when a queue is full the message is dropped and counted, so a
//! dead or slow collector only ever costs its own messages. Connections
//! are dialed lazily and rebuilt after any failure.
//!
//! # Example
//!
//! ```ignore
//! use logdrain_syslog::{Out, OutConfig, SinkDescriptor};
//!
//! let out = Out::new(sinks, cluster_sinks, OutConfig::default());
//! out.write(&record, chrono::Utc::now(), "pod.log");
//! let states = out.sink_states();
//! ```

/// Record value model: heterogeneously-typed maps with safe downcasts
pub mod record;

/// RFC 5424 message building and RFC 6587 framing
pub mod message;

/// TCP/TLS connection strategies
pub mod connect;

/// One downstream collector: bounded queue, writer task, health state
pub mod sink;

/// Namespace routing and fan-out
pub mod out;

pub use connect::{ConnectError, TlsSettings};
pub use message::{Message, build, sanitize_hostname};
pub use out::{Out, OutConfig};
pub use record::Value;
pub use sink::{Sink, SinkDescriptor, SinkError, SinkState};
