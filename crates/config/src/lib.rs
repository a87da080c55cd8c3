//! Logdrain - Configuration
//!
//! Parses the plugin's string properties into validated settings: the
//! namespace-bound and cluster sink lists (JSON descriptors), the
//! hostname-sanitizer switch, and the state-endpoint binding.
//!
//! Configuration problems are the only fatal error class in the plugin:
//! everything here surfaces before the first record flows.
//!
//! # Example
//!
//! ```
//! use logdrain_config::Settings;
//!
//! let settings = Settings::from_json(r#"{
//!     "sinks": [{"addr": "logs.example.com:6514", "namespace": "kube-system"}],
//!     "sanitizehost": "true"
//! }"#).unwrap();
//! assert_eq!(settings.sinks.len(), 1);
//! ```

mod error;
mod settings;

pub use error::{ConfigError, Result};
pub use settings::{DEFAULT_STATS_ADDR, Settings};
