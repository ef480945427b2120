//! Deployment settings for the invocation core.

use std::env;

use serde::Deserialize;

use crate::serialize::Format;

/// Environment variable toggling technical traces in error records.
pub const SHOW_TRACE_VAR: &str = "INVOKE_SHOW_TRACE";
/// Environment variable naming the default output format by extension.
pub const DEFAULT_FORMAT_VAR: &str = "INVOKE_DEFAULT_FORMAT";

/// Settings read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Attach technical traces to defect-level error records
    pub show_trace: bool,
    /// Format used when the request does not ask for one
    pub default_format: Format,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Unset or unrecognized values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            show_trace: lookup(SHOW_TRACE_VAR)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.show_trace),
            default_format: lookup(DEFAULT_FORMAT_VAR)
                .and_then(|v| Format::from_extension(v.trim()))
                .unwrap_or(defaults.default_format),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_hide_traces_and_render_html() {
        let settings = Settings::default();
        assert!(!settings.show_trace);
        assert_eq!(settings.default_format, Format::Html);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[
            (SHOW_TRACE_VAR, "Yes"),
            (DEFAULT_FORMAT_VAR, "json"),
        ]));
        assert!(settings.show_trace);
        assert_eq!(settings.default_format, Format::Json);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[
            (SHOW_TRACE_VAR, "maybe"),
            (DEFAULT_FORMAT_VAR, "docx"),
        ]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn settings_deserialize_with_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"default_format":"text"}"#).unwrap();
        assert!(!settings.show_trace);
        assert_eq!(settings.default_format, Format::Text);
    }
}
