//! Plugin instance
//!
//! One `Instance` owns everything a configured plugin needs: the routing
//! engine, the tokio runtime its sink writers and state endpoint run on,
//! and nothing else. Dropping the instance tears the runtime down, which
//! closes connections; queued messages are lost, which the delivery
//! contract allows.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use logdrain_config::{ConfigError, Settings};
use logdrain_syslog::{Out, OutConfig};
use logdrain_web::SinkStateProvider;

use crate::decode::decode_entries;

/// Errors that abort plugin initialization.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
}

/// A fully initialized plugin: routing engine plus its runtime.
pub struct Instance {
    out: Arc<Out>,
    /// Keeps sink writers and the state endpoint alive; dropped last
    _runtime: tokio::runtime::Runtime,
}

impl Instance {
    /// Parse properties and bring up a plugin instance.
    pub fn from_properties(properties: &str) -> Result<Self, InitError> {
        Self::new(Settings::from_json(properties)?)
    }

    /// Bring up a plugin instance from parsed settings: start the sink
    /// writers and the state endpoint.
    pub fn new(settings: Settings) -> Result<Self, InitError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("logdrain")
            .build()
            .map_err(InitError::Runtime)?;

        tracing::info!(
            sinks = settings.sinks.len(),
            cluster_sinks = settings.cluster_sinks.len(),
            sanitize_host = settings.sanitize_host,
            stats_addr = %settings.stats_addr,
            "initializing syslog output"
        );

        let config = OutConfig::default().with_sanitize_host(settings.sanitize_host);
        let out = {
            let _guard = runtime.enter();
            Arc::new(Out::new(settings.sinks, settings.cluster_sinks, config))
        };

        let provider: Arc<dyn SinkStateProvider> = Arc::clone(&out) as Arc<dyn SinkStateProvider>;
        let stats_addr = settings.stats_addr;
        runtime.spawn(async move {
            // A lost state endpoint degrades observability, not delivery.
            match TcpListener::bind(&stats_addr).await {
                Ok(listener) => {
                    if let Err(e) = logdrain_web::serve(listener, provider).await {
                        tracing::error!(addr = %stats_addr, error = %e, "state endpoint failed");
                    }
                }
                Err(e) => {
                    tracing::error!(addr = %stats_addr, error = %e, "failed to bind state endpoint");
                }
            }
        });

        Ok(Self {
            out,
            _runtime: runtime,
        })
    }

    /// Decode one flush payload and route every record. Never blocks on
    /// the network and never fails: undeliverable records are dropped by
    /// their sinks.
    pub fn flush(&self, data: &[u8], tag: &str) {
        for entry in decode_entries(data) {
            self.out.write(&entry.record, entry.timestamp, tag);
        }
    }

    /// The routing engine, for state inspection.
    pub fn out(&self) -> &Arc<Out> {
        &self.out
    }
}
