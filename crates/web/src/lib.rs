//! Logdrain - State endpoint
//!
//! A read-only HTTP surface for sink health: `GET /` returns a JSON array
//! with one entry per sink - its name, namespace, last successful send,
//! and last error (or null once a write succeeds again).
//!
//! The endpoint only ever reads lock-free snapshots; it cannot slow the
//! forwarding path down.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use logdrain_web::serve;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! serve(listener, out).await?;
//! ```

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use tokio::net::TcpListener;

use logdrain_syslog::{Out, SinkState};

/// A source of sink-state snapshots.
pub trait SinkStateProvider: Send + Sync {
    fn sink_states(&self) -> Vec<SinkState>;
}

impl SinkStateProvider for Out {
    fn sink_states(&self) -> Vec<SinkState> {
        Out::sink_states(self)
    }
}

/// Concatenates the snapshots of several providers.
#[derive(Default)]
pub struct MultiStateProvider {
    providers: Vec<Arc<dyn SinkStateProvider>>,
}

impl MultiStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, provider: Arc<dyn SinkStateProvider>) {
        self.providers.push(provider);
    }
}

impl SinkStateProvider for MultiStateProvider {
    fn sink_states(&self) -> Vec<SinkState> {
        self.providers
            .iter()
            .flat_map(|p| p.sink_states())
            .collect()
    }
}

/// Build the state router: `GET /` serves the sink-state array.
pub fn router(provider: Arc<dyn SinkStateProvider>) -> Router {
    Router::new()
        .route("/", get(state_handler))
        .with_state(provider)
}

/// Serve the state endpoint until the listener fails.
pub async fn serve(
    listener: TcpListener,
    provider: Arc<dyn SinkStateProvider>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "state endpoint listening");
    }
    axum::serve(listener, router(provider)).await
}

async fn state_handler(
    State(provider): State<Arc<dyn SinkStateProvider>>,
) -> Json<Vec<SinkState>> {
    Json(provider.sink_states())
}
