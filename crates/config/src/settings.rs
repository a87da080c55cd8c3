//! Plugin settings
//!
//! The host hands the plugin a flat set of string properties. The sink
//! lists arrive as JSON arrays, either inline or embedded in a string,
//! which is how hosts that only speak string properties deliver them.

use logdrain_syslog::SinkDescriptor;
use serde_json::Value as Json;

use crate::error::{ConfigError, Result};

/// Default binding for the HTTP state endpoint
pub const DEFAULT_STATS_ADDR: &str = "127.0.0.1:5000";

/// Fully parsed and validated plugin settings.
///
/// # Properties
///
/// | Key | Meaning | Default |
/// |-----|---------|---------|
/// | `sinks` | JSON array of namespace-bound sink descriptors | `[]` |
/// | `clustersinks` | JSON array of cluster sink descriptors | `[]` |
/// | `sanitizehost` | normalize hostnames before rendering | `true` |
/// | `statsaddr` | `host:port` for the state endpoint | `127.0.0.1:5000` |
///
/// At least one of `sinks` / `clustersinks` must yield a sink.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sinks: Vec<SinkDescriptor>,
    pub cluster_sinks: Vec<SinkDescriptor>,
    pub sanitize_host: bool,
    pub stats_addr: String,
}

impl Settings {
    /// Parse settings from a JSON object of plugin properties.
    pub fn from_json(properties: &str) -> Result<Self> {
        let root: Json = serde_json::from_str(properties)?;
        let Some(object) = root.as_object() else {
            return Err(ConfigError::NotAnObject);
        };

        let sinks = sink_list(object.get("sinks"), "sinks")?;
        let cluster_sinks = sink_list(object.get("clustersinks"), "clustersinks")?;
        if sinks.is_empty() && cluster_sinks.is_empty() {
            return Err(ConfigError::NoSinksConfigured);
        }

        for sink in sinks.iter().chain(&cluster_sinks) {
            // Port-less addresses would otherwise surface much later, as a
            // dial error on the first message.
            if sink.addr.is_empty() || !sink.addr.contains(':') {
                return Err(ConfigError::InvalidAddr {
                    name: sink.name.clone(),
                    addr: sink.addr.clone(),
                });
            }
        }

        Ok(Self {
            sinks,
            cluster_sinks,
            sanitize_host: bool_property(object.get("sanitizehost"), "sanitizehost", true)?,
            stats_addr: string_property(
                object.get("statsaddr"),
                "statsaddr",
                DEFAULT_STATS_ADDR,
            )?,
        })
    }
}

fn sink_list(value: Option<&Json>, key: &'static str) -> Result<Vec<SinkDescriptor>> {
    match value {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(Json::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(Json::String(s)) => {
            serde_json::from_str(s).map_err(|source| ConfigError::InvalidSinks { key, source })
        }
        Some(array @ Json::Array(_)) => serde_json::from_value(array.clone())
            .map_err(|source| ConfigError::InvalidSinks { key, source }),
        Some(_) => Err(ConfigError::SinksNotAnArray { key }),
    }
}

fn bool_property(value: Option<&Json>, key: &'static str, default: bool) -> Result<bool> {
    let value = match value {
        None | Some(Json::Null) => return Ok(default),
        Some(Json::Bool(b)) => return Ok(*b),
        Some(Json::String(s)) => s,
        Some(other) => {
            return Err(ConfigError::InvalidBool {
                key,
                value: other.to_string(),
            });
        }
    };

    if value.is_empty() {
        Ok(default)
    } else if value.eq_ignore_ascii_case("true") || value == "1" {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Ok(false)
    } else {
        Err(ConfigError::InvalidBool {
            key,
            value: value.clone(),
        })
    }
}

fn string_property(value: Option<&Json>, key: &'static str, default: &str) -> Result<String> {
    match value {
        None | Some(Json::Null) => Ok(default.to_string()),
        Some(Json::String(s)) if s.is_empty() => Ok(default.to_string()),
        Some(Json::String(s)) => Ok(s.clone()),
        Some(_) => Err(ConfigError::NotAString { key }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_sink_arrays() {
        let settings = Settings::from_json(
            r#"{
                "sinks": [
                    {"addr": "logs.example.com:6514", "name": "a", "namespace": "ns1"},
                    {"addr": "10.0.0.1:514", "name": "b", "namespace": "ns2",
                     "tls": {"insecure_skip_verify": true}}
                ],
                "clustersinks": [{"addr": "all.example.com:6514", "name": "c"}]
            }"#,
        )
        .unwrap();

        assert_eq!(settings.sinks.len(), 2);
        assert_eq!(settings.sinks[0].addr, "logs.example.com:6514");
        assert_eq!(settings.sinks[0].namespace, "ns1");
        assert!(settings.sinks[0].tls.is_none());
        assert!(settings.sinks[1].tls.as_ref().unwrap().insecure_skip_verify);

        assert_eq!(settings.cluster_sinks.len(), 1);
        assert_eq!(settings.cluster_sinks[0].name, "c");

        assert!(settings.sanitize_host);
        assert_eq!(settings.stats_addr, DEFAULT_STATS_ADDR);
    }

    #[test]
    fn parses_string_embedded_sink_arrays() {
        let settings = Settings::from_json(
            r#"{"sinks": "[{\"addr\": \"logs.example.com:6514\", \"namespace\": \"ns1\"}]"}"#,
        )
        .unwrap();
        assert_eq!(settings.sinks.len(), 1);
        assert_eq!(settings.sinks[0].addr, "logs.example.com:6514");
    }

    #[test]
    fn parses_tls_root_ca() {
        let settings = Settings::from_json(
            r#"{"clustersinks": [{"addr": "a:1", "tls": {"root_ca": "/etc/certs/ca.pem"}}]}"#,
        )
        .unwrap();
        let tls = settings.cluster_sinks[0].tls.as_ref().unwrap();
        assert!(!tls.insecure_skip_verify);
        assert_eq!(tls.root_ca, "/etc/certs/ca.pem");
    }

    #[test]
    fn boolean_properties_accept_strings_and_bools() {
        let base = r#""sinks": [{"addr": "a:1"}]"#;
        for (raw, expected) in [
            (r#""true""#, true),
            (r#""TRUE""#, true),
            (r#""1""#, true),
            (r#""false""#, false),
            (r#""0""#, false),
            ("true", true),
            ("false", false),
        ] {
            let settings =
                Settings::from_json(&format!("{{{base}, \"sanitizehost\": {raw}}}")).unwrap();
            assert_eq!(settings.sanitize_host, expected, "raw: {raw}");
        }
    }

    #[test]
    fn unparsable_boolean_is_fatal() {
        let err = Settings::from_json(
            r#"{"sinks": [{"addr": "a:1"}], "sanitizehost": "maybe"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
    }

    #[test]
    fn missing_both_sink_lists_is_fatal() {
        let err = Settings::from_json("{}").unwrap_err();
        assert!(matches!(err, ConfigError::NoSinksConfigured));

        let err = Settings::from_json(r#"{"sinks": [], "clustersinks": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoSinksConfigured));
    }

    #[test]
    fn one_sink_list_is_enough() {
        assert!(Settings::from_json(r#"{"sinks": [{"addr": "a:1"}]}"#).is_ok());
        assert!(Settings::from_json(r#"{"clustersinks": [{"addr": "a:1"}]}"#).is_ok());
    }

    #[test]
    fn malformed_documents_are_fatal() {
        assert!(matches!(
            Settings::from_json("not json").unwrap_err(),
            ConfigError::Parse(_),
        ));
        assert!(matches!(
            Settings::from_json("[1, 2]").unwrap_err(),
            ConfigError::NotAnObject,
        ));
        assert!(matches!(
            Settings::from_json(r#"{"sinks": 5}"#).unwrap_err(),
            ConfigError::SinksNotAnArray { key: "sinks" },
        ));
        assert!(matches!(
            Settings::from_json(r#"{"sinks": "still not an array"}"#).unwrap_err(),
            ConfigError::InvalidSinks { key: "sinks", .. },
        ));
    }

    #[test]
    fn sink_without_addr_is_fatal() {
        let err = Settings::from_json(r#"{"sinks": [{"name": "x"}]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSinks { .. }));
    }

    #[test]
    fn addr_without_port_is_fatal() {
        let err = Settings::from_json(
            r#"{"sinks": [{"addr": "no-port", "name": "x"}]}"#,
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidAddr { name, addr } => {
                assert_eq!(name, "x");
                assert_eq!(addr, "no-port");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stats_addr_overrides_the_default() {
        let settings = Settings::from_json(
            r#"{"sinks": [{"addr": "a:1"}], "statsaddr": "0.0.0.0:8080"}"#,
        )
        .unwrap();
        assert_eq!(settings.stats_addr, "0.0.0.0:8080");
    }
}
