use crate::domain::ports::SettingsProvider;
use crate::domain::settings::SettingKey;
use crate::error::{GatewayError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Settings read from a flat JSON object such as
/// `{"secret_key": "sk_test_...", "mode": "sandbox", "is_3d": 1}`.
///
/// The file is re-read on every lookup, so edits take effect on the next call.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&raw)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(GatewayError::ConfigurationError(format!(
                "Settings file {} must contain a JSON object",
                self.path.display()
            ))),
        }
    }
}

fn as_setting(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        _ => None,
    }
}

impl SettingsProvider for JsonFileSettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        match self.load() {
            Ok(map) => map.get(key.as_str()).and_then(as_setting),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read settings file");
                None
            }
        }
    }
}
