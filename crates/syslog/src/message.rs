//! RFC 5424 message building
//!
//! Converts one log record into a syslog message plus the Kubernetes
//! namespace used for routing. Building is a pure, total function: absent
//! or mistyped record fields degrade to empty output fields, they never
//! fail the conversion.
//!
//! # Wire format
//!
//! Messages render as RFC 5424 and are framed for the wire with RFC 6587
//! octet counting:
//!
//! ```text
//! <len> SP <14>1 SP TIMESTAMP SP HOSTNAME SP APP-NAME SP - SP - SP SD SP MSG
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

use crate::record::Value;

/// Tag prefix marking Kubernetes event streams
const EVENT_PREFIX: &str = "k8s.event";

/// App-name prefix for ordinary pod logs
const LOG_PREFIX: &str = "pod.log";

/// SD-ID of the structured data element carrying Kubernetes metadata
const SD_ID: &str = "kubernetes@47450";

/// RFC 5424 limits APP-NAME to 48 octets
const MAX_APP_NAME: usize = 48;

/// Syslog priority: user-level facility (1), informational severity (6)
const PRIORITY: u8 = 14;

/// One structured data parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SdParam {
    pub(crate) name: String,
    pub(crate) value: String,
}

impl SdParam {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A built RFC 5424 message, ready to render.
///
/// The hostname is carried raw; sanitization is a per-sink concern applied
/// at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) hostname: String,
    pub(crate) app_name: String,
    pub(crate) structured_data: Option<Vec<SdParam>>,
    pub(crate) body: Vec<u8>,
}

impl Message {
    /// Render the message as RFC 5424 bytes.
    pub fn render(&self, sanitize_host: bool) -> Vec<u8> {
        let hostname = if sanitize_host {
            sanitize_hostname(&self.hostname)
        } else {
            self.hostname.clone()
        };

        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(format!("<{}>1 ", PRIORITY).as_bytes());
        out.extend_from_slice(
            self.timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, false)
                .as_bytes(),
        );
        out.push(b' ');
        push_field(&mut out, &hostname);
        push_field(&mut out, &self.app_name);
        // PROCID and MSGID are never set
        out.extend_from_slice(b"- - ");
        match &self.structured_data {
            Some(params) => push_structured_data(&mut out, params),
            None => out.push(b'-'),
        }
        out.push(b' ');
        out.extend_from_slice(&self.body);
        out
    }

    /// Render the message and prepend the RFC 6587 octet-counting frame:
    /// the decimal byte length of the rendered message and a single space.
    pub fn frame(&self, sanitize_host: bool) -> Vec<u8> {
        let msg = self.render(sanitize_host);
        let mut out = Vec::with_capacity(msg.len() + 8);
        out.extend_from_slice(msg.len().to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(&msg);
        out
    }
}

/// Build a syslog message from one record.
///
/// Returns the message and the record's Kubernetes namespace (possibly
/// empty), which the router uses to select destination sinks.
pub fn build(record: &Value, timestamp: DateTime<Utc>, tag: &str) -> (Message, String) {
    let mut log_bytes: &[u8] = &[];
    let mut cluster_name: &[u8] = &[];
    let mut k8s: Option<&[(Value, Value)]> = None;

    if let Some(entries) = record.as_map() {
        for (k, v) in entries {
            let Some(key) = k.as_str() else { continue };
            match key {
                "log" => {
                    if let Some(b) = v.as_bytes() {
                        log_bytes = b;
                    }
                }
                "kubernetes" => {
                    if let Some(m) = v.as_map() {
                        k8s = Some(m);
                    }
                }
                "cluster_name" => {
                    if let Some(b) = v.as_bytes() {
                        cluster_name = b;
                    }
                }
                _ => {}
            }
        }
    }

    let mut vm_id = String::new();
    let mut pod_name = String::new();
    let mut namespace = String::new();
    let mut container_name = String::new();
    let mut labels = Vec::new();

    if let Some(entries) = k8s {
        for (k, v) in entries {
            let Some(key) = k.as_str() else { continue };
            match key {
                "host" => {
                    if let Some(b) = v.as_bytes() {
                        vm_id = String::from_utf8_lossy(b).into_owned();
                    }
                }
                "pod_name" => {
                    if let Some(b) = v.as_bytes() {
                        pod_name = String::from_utf8_lossy(b).into_owned();
                    }
                }
                "namespace_name" => {
                    if let Some(b) = v.as_bytes() {
                        namespace = String::from_utf8_lossy(b).into_owned();
                    }
                }
                "container_name" => {
                    if let Some(b) = v.as_bytes() {
                        container_name = String::from_utf8_lossy(b).into_owned();
                    }
                }
                "labels" => {
                    if let Some(m) = v.as_map() {
                        labels = label_params(m);
                    }
                }
                _ => {}
            }
        }
    }

    let has_k8s = k8s.is_some_and(|m| !m.is_empty());

    let app_name = if has_k8s {
        let prefix = if tag.starts_with(EVENT_PREFIX) {
            EVENT_PREFIX
        } else {
            LOG_PREFIX
        };
        let mut name = format!("{prefix}/{namespace}/{pod_name}/{container_name}");
        truncate_to_boundary(&mut name, MAX_APP_NAME);
        name
    } else {
        String::new()
    };

    let structured_data = has_k8s.then(|| {
        let mut params = labels;
        params.push(SdParam::new("namespace_name", namespace.clone()));
        params.push(SdParam::new("object_name", pod_name));
        params.push(SdParam::new("container_name", container_name));
        if !vm_id.is_empty() {
            params.push(SdParam::new("vm_id", vm_id.clone()));
        }
        params
    });

    let mut body = log_bytes.to_vec();
    if !body.ends_with(b"\n") {
        body.push(b'\n');
    }

    let hostname = if cluster_name.is_empty() {
        vm_id
    } else {
        String::from_utf8_lossy(cluster_name).into_owned()
    };

    (
        Message {
            timestamp,
            hostname,
            app_name,
            structured_data,
            body,
        },
        namespace,
    )
}

/// Normalize a hostname to `[A-Za-z0-9.-]`.
///
/// Every run of characters outside the class collapses to a single `-`,
/// then leading and trailing `-` are stripped from each dot-separated
/// label. A trailing `.` survives. Idempotent.
pub fn sanitize_hostname(host: &str) -> String {
    let mut collapsed = String::with_capacity(host.len());
    let mut in_run = false;
    for c in host.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
            collapsed.push(c);
            in_run = false;
        } else if !in_run {
            collapsed.push('-');
            in_run = true;
        }
    }

    collapsed
        .split('.')
        .map(|label| label.trim_matches('-'))
        .collect::<Vec<_>>()
        .join(".")
}

fn label_params(entries: &[(Value, Value)]) -> Vec<SdParam> {
    let mut params = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let Some(name) = k.as_str() else { continue };
        let Some(bytes) = v.as_bytes() else { continue };
        params.push(SdParam::new(name, String::from_utf8_lossy(bytes)));
    }
    params
}

/// Write `value` or `-` when empty, followed by a space.
fn push_field(out: &mut Vec<u8>, value: &str) {
    if value.is_empty() {
        out.push(b'-');
    } else {
        out.extend_from_slice(value.as_bytes());
    }
    out.push(b' ');
}

fn push_structured_data(out: &mut Vec<u8>, params: &[SdParam]) {
    out.push(b'[');
    out.extend_from_slice(SD_ID.as_bytes());
    for param in params {
        out.push(b' ');
        out.extend_from_slice(param.name.as_bytes());
        out.extend_from_slice(b"=\"");
        for &b in param.value.as_bytes() {
            // RFC 5424 6.3.3: escape backslash, double quote and closing
            // bracket inside PARAM-VALUE
            if b == b'\\' || b == b'"' || b == b']' {
                out.push(b'\\');
            }
            out.push(b);
        }
        out.push(b'"');
    }
    out.push(b']');
}

/// Truncate to at most `max` bytes, rounding down to a char boundary so
/// the result stays valid UTF-8.
fn truncate_to_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[cfg(test)]
#[path = "message_test.rs"]
mod message_test;
