//! Plugin ABI entry points
//!
//! The C surface the host drives: `register → init → flush → exit`.
//! These shims only translate pointers and status codes; all behavior
//! lives in the safe [`Instance`](crate::Instance) and
//! [`registry`](crate::registry) layers.
//!
//! `init` returns a non-zero instance handle that the host stores in its
//! context slot and passes back on every flush; `0` signals an
//! initialization failure. Panics never cross the boundary.

use std::ffi::{CStr, c_char, c_int};
use std::panic::catch_unwind;

use crate::instance::Instance;
use crate::registry;

/// Host status code: the operation failed
pub const FLB_ERROR: c_int = 0;

/// Host status code: the operation succeeded
pub const FLB_OK: c_int = 1;

static PLUGIN_NAME: &CStr = c"syslog";
static PLUGIN_DESCRIPTION: &CStr = c"syslog output plugin that follows RFC 5424";

/// Advertise the plugin's name and description to the host.
///
/// # Safety
///
/// `name` and `description`, when non-null, must be valid out-pointers.
/// The strings written through them are static and stay valid for the
/// process lifetime.
#[no_mangle]
pub unsafe extern "C" fn out_syslog_register(
    name: *mut *const c_char,
    description: *mut *const c_char,
) -> c_int {
    if !name.is_null() {
        *name = PLUGIN_NAME.as_ptr();
    }
    if !description.is_null() {
        *description = PLUGIN_DESCRIPTION.as_ptr();
    }
    FLB_OK
}

/// Initialize an output instance from a JSON object of plugin properties.
///
/// Returns the instance handle, or `0` on any configuration error - the
/// only fatal path in the plugin.
///
/// # Safety
///
/// `properties` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn out_syslog_init(properties: *const c_char) -> u64 {
    catch_unwind(|| {
        init_tracing();

        if properties.is_null() {
            tracing::error!("plugin properties pointer is null");
            return 0;
        }
        let properties = match CStr::from_ptr(properties).to_str() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "plugin properties are not valid UTF-8");
                return 0;
            }
        };

        match Instance::from_properties(properties) {
            Ok(instance) => registry::global().insert(instance),
            Err(e) => {
                tracing::error!(error = %e, "plugin initialization failed");
                0
            }
        }
    })
    .unwrap_or(0)
}

/// Route one flush payload: a MessagePack stream of `[timestamp, record]`
/// entries, tagged with the host's stream tag.
///
/// Fails only for an unknown handle. Undeliverable records are dropped by
/// their sinks, never reported here.
///
/// # Safety
///
/// `data` must point to `len` readable bytes (or be null with `len` 0)
/// and `tag` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn out_syslog_flush(
    handle: u64,
    data: *const u8,
    len: usize,
    tag: *const c_char,
) -> c_int {
    catch_unwind(|| {
        let Some(instance) = registry::global().get(handle) else {
            tracing::error!(handle, "flush for unknown plugin instance");
            return FLB_ERROR;
        };

        let data = if data.is_null() || len == 0 {
            &[][..]
        } else {
            std::slice::from_raw_parts(data, len)
        };
        let tag = if tag.is_null() {
            String::new()
        } else {
            CStr::from_ptr(tag).to_string_lossy().into_owned()
        };

        instance.flush(data, &tag);
        FLB_OK
    })
    .unwrap_or(FLB_ERROR)
}

/// Tear down an output instance. Connections close; queued messages are
/// not drained. Unknown handles are ignored.
#[no_mangle]
pub extern "C" fn out_syslog_exit(handle: u64) -> c_int {
    catch_unwind(|| {
        registry::global().remove(handle);
        FLB_OK
    })
    .unwrap_or(FLB_ERROR)
}

/// Install the tracing subscriber once per process. Respects `RUST_LOG`,
/// defaults to `info`, and writes to stderr so host pipelines on stdout
/// stay clean.
fn init_tracing() {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}

#[cfg(test)]
#[path = "ffi_test.rs"]
mod ffi_test;
