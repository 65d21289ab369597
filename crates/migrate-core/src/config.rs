use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::error::{MigrationError, Result};

// ---------------------------------------------------------------------------
// ScriptConfig
// ---------------------------------------------------------------------------

/// Read-only key/value configuration handed to every script.
///
/// Built from an optional JSON file and any number of inline `key:value`
/// pairs; an inline pair overrides a file key of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptConfig(Map<String, Value>);

impl ScriptConfig {
    pub fn load(file: Option<&Path>, inline: &[String]) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        for pair in inline {
            let (key, value) = Self::parse_pair(pair)?;
            config.0.insert(key, value);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&data)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(MigrationError::Config(format!(
                "{} must contain a JSON object",
                path.display()
            ))),
        }
    }

    /// Split `key:value` at the first colon. The value is kept as a string.
    pub fn parse_pair(pair: &str) -> Result<(String, Value)> {
        let Some((key, value)) = pair.split_once(':') else {
            return Err(MigrationError::Config(format!(
                "'{pair}' is not a key:value pair"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(MigrationError::Config(format!("'{pair}' has an empty key")));
        }
        Ok((key.to_string(), Value::String(value.trim().to_string())))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ScriptConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ---------------------------------------------------------------------------
// StackSettings
// ---------------------------------------------------------------------------

/// Credentials and branch for the target stack.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StackSettings {
    pub api_key: String,
    pub management_token: Option<String>,
    pub branch: Option<String>,
}

impl StackSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_management_token(mut self, token: impl Into<String>) -> Self {
        self.management_token = Some(token.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

impl fmt::Debug for StackSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSettings")
            .field("api_key", &self.api_key)
            .field(
                "management_token",
                &self.management_token.as_ref().map(|_| "<redacted>"),
            )
            .field("branch", &self.branch)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn inline_pairs_override_file() {
        let file = file_with(r#"{ "env": "staging", "limit": 10 }"#);
        let config = ScriptConfig::load(
            Some(file.path()),
            &["env:production".to_string(), "url:https://example.com".to_string()],
        )
        .unwrap();
        assert_eq!(config.get_str("env"), Some("production"));
        assert_eq!(config.get("limit"), Some(&json!(10)));
        assert_eq!(config.get_str("url"), Some("https://example.com"));
    }

    #[test]
    fn pair_without_colon_is_config_error() {
        let err = ScriptConfig::load(None, &["oops".to_string()]).unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
        assert!(ScriptConfig::parse_pair(":value").is_err());
    }

    #[test]
    fn non_object_file_is_rejected() {
        let file = file_with("[1, 2]");
        let err = ScriptConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("must contain a JSON object"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScriptConfig::from_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, MigrationError::Io(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let settings = StackSettings::new("blt123").with_management_token("secret");
        let printed = format!("{settings:?}");
        assert!(printed.contains("blt123"));
        assert!(!printed.contains("secret"));
    }
}
