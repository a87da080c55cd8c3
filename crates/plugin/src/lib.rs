//! Logdrain - Plugin host glue
//!
//! Binds the forwarding core to an output-plugin host. The host drives
//! four entry points:
//!
//! 1. `out_syslog_register` - advertise the plugin name and description
//! 2. `out_syslog_init` - parse properties, start sinks and the state
//!    endpoint, return an opaque instance handle
//! 3. `out_syslog_flush` - decode a MessagePack batch of records and
//!    route each one
//! 4. `out_syslog_exit` - tear the instance down
//!
//! Everything behind the C shims is safe Rust: a [`Registry`] maps
//! handles to [`Instance`]s, each of which owns its own tokio runtime,
//! routing engine, and state endpoint. No pointer ever crosses the ABI.

/// Flush-payload decoding: MessagePack entries to core records
pub mod decode;

/// C ABI entry points and status codes
pub mod ffi;

/// One initialized plugin: routing engine plus runtime
mod instance;

/// Handle-keyed store of live instances
pub mod registry;

pub use decode::{Entry, decode_entries};
pub use ffi::{FLB_ERROR, FLB_OK};
pub use instance::{InitError, Instance};
pub use registry::Registry;
