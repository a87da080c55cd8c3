use std::ffi::CString;
use std::ptr;

use super::*;

fn init(properties: &str) -> u64 {
    let properties = CString::new(properties).unwrap();
    unsafe { out_syslog_init(properties.as_ptr()) }
}

#[test]
fn register_reports_the_plugin_identity() {
    let mut name: *const c_char = ptr::null();
    let mut description: *const c_char = ptr::null();

    let status = unsafe { out_syslog_register(&mut name, &mut description) };

    assert_eq!(status, FLB_OK);
    assert_eq!(unsafe { CStr::from_ptr(name) }.to_str().unwrap(), "syslog");
    assert!(
        unsafe { CStr::from_ptr(description) }
            .to_str()
            .unwrap()
            .contains("RFC 5424")
    );
}

#[test]
fn register_tolerates_null_out_pointers() {
    let status = unsafe { out_syslog_register(ptr::null_mut(), ptr::null_mut()) };
    assert_eq!(status, FLB_OK);
}

#[test]
fn init_returns_zero_for_null_properties() {
    assert_eq!(unsafe { out_syslog_init(ptr::null()) }, 0);
}

#[test]
fn init_returns_zero_for_bad_configuration() {
    assert_eq!(init("not json"), 0);
    assert_eq!(init("{}"), 0);
    assert_eq!(init(r#"{"sinks": [{"addr": "missing-port"}]}"#), 0);
}

#[test]
fn init_returns_a_live_handle_for_good_configuration() {
    let handle = init(
        r#"{"clustersinks": [{"addr": "127.0.0.1:1", "name": "c"}],
            "statsaddr": "127.0.0.1:0"}"#,
    );
    assert_ne!(handle, 0);

    let instance = crate::registry::global().get(handle).unwrap();
    let states = instance.out().sink_states();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].name, "c");
    drop(instance);

    assert_eq!(out_syslog_exit(handle), FLB_OK);
    assert!(crate::registry::global().get(handle).is_none());
}

#[test]
fn flush_fails_for_unknown_handles() {
    let status = unsafe { out_syslog_flush(u64::MAX, ptr::null(), 0, ptr::null()) };
    assert_eq!(status, FLB_ERROR);
}

#[test]
fn flush_accepts_empty_payloads() {
    let handle = init(
        r#"{"clustersinks": [{"addr": "127.0.0.1:1", "name": "c"}],
            "statsaddr": "127.0.0.1:0"}"#,
    );
    let status = unsafe { out_syslog_flush(handle, ptr::null(), 0, ptr::null()) };
    assert_eq!(status, FLB_OK);
    out_syslog_exit(handle);
}

#[test]
fn exit_is_idempotent_and_ignores_unknown_handles() {
    assert_eq!(out_syslog_exit(u64::MAX), FLB_OK);
}
