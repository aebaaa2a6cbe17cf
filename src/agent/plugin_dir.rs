//! Batch plugin registration from a directory of value files.
//!
//! Files whose name is a dotted OID (`1.3.6.1.4.1.99999`) are parsed as JSON
//! and registered as constant plugins at that OID. JSON maps onto producer
//! shapes directly: numbers become integers, strings stay strings, arrays
//! become ordered sequences, and objects become mappings whose keys must be
//! decimal sub-identifiers (or `cache`). Anything else in the directory is
//! ignored, and a file that fails to parse or register is logged and
//! skipped: one broken file never aborts the batch.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mib::{MapKey, PluginValue};
use crate::oid::Oid;

use super::Agent;

impl Agent {
    /// Register a plugin for every OID-named JSON file in `dir`.
    ///
    /// Fails only if the directory itself cannot be read; per-file problems
    /// are logged at warning level and skipped.
    pub fn add_plugin_dir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| Error::Io {
            target: None,
            source,
        })?;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(%error, "unreadable directory entry");
                    continue;
                }
            };
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if !is_oid_file_name(name) {
                debug!(file = name, "ignoring non-OID file");
                continue;
            }
            let oid = match Oid::parse(name.trim_end_matches('.')) {
                Ok(oid) => oid,
                Err(error) => {
                    warn!(file = name, %error, "skipping file with unparseable name");
                    continue;
                }
            };
            let text = match fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(error) => {
                    warn!(file = name, %error, "skipping unreadable file");
                    continue;
                }
            };
            let json: serde_json::Value = match serde_json::from_str(&text) {
                Ok(json) => json,
                Err(error) => {
                    warn!(file = name, %error, "skipping unparseable plugin file");
                    continue;
                }
            };
            if let Err(error) = self.add_plugin_value(oid, plugin_value_from_json(json)) {
                warn!(file = name, %error, "skipping unregistrable plugin file");
            }
        }
        Ok(())
    }
}

/// Matches `^([0-9]+\.?)+$`: dotted decimal, optional trailing dot.
fn is_oid_file_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some(&first) = bytes.first() else {
        return false;
    };
    if !first.is_ascii_digit() {
        return false;
    }
    let mut last_was_dot = false;
    for &b in bytes {
        match b {
            b'0'..=b'9' => last_was_dot = false,
            b'.' if !last_was_dot => last_was_dot = true,
            _ => return false,
        }
    }
    true
}

/// Map a JSON document onto a producer value.
fn plugin_value_from_json(json: serde_json::Value) -> PluginValue {
    match json {
        serde_json::Value::Null => PluginValue::Nil,
        serde_json::Value::Bool(b) => PluginValue::Int(i64::from(b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => PluginValue::Int(i),
            // Floats and out-of-range numbers fall back to their rendering.
            None => PluginValue::Str(n.to_string()),
        },
        serde_json::Value::String(s) => PluginValue::Str(s),
        serde_json::Value::Array(items) => {
            PluginValue::List(items.into_iter().map(plugin_value_from_json).collect())
        }
        serde_json::Value::Object(entries) => PluginValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| {
                    let key = if key == "cache" {
                        MapKey::Cache
                    } else {
                        match key.parse::<u32>() {
                            Ok(sub) => MapKey::Sub(sub),
                            Err(_) => MapKey::Named(key),
                        }
                    };
                    (key, plugin_value_from_json(value))
                })
                .collect(),
        ),
    }
}
