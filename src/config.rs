use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::permissions::{ApplicationFlag, DEFAULT_USER_ID};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    pub default_user_id: i32,
    pub application_flag: ApplicationFlag,
    /// Overrides the bundle name reported by the host context.
    pub bundle_name: Option<String>,
    pub fixture_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default_user_id: DEFAULT_USER_ID,
            application_flag: ApplicationFlag::GetApplicationInfoDefault,
            bundle_name: None,
            fixture_path: None,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Environment variables win over whatever is already set.
    pub fn apply_env(mut self) -> Self {
        if let Ok(val) = std::env::var("DSCREEN_USER_ID") {
            match val.parse() {
                Ok(user_id) => self.default_user_id = user_id,
                Err(_) => log::warn!("Ignoring invalid DSCREEN_USER_ID: {}", val),
            }
        }

        if let Ok(val) = std::env::var("DSCREEN_APPLICATION_FLAG") {
            match parse_flag(&val) {
                Some(flag) => self.application_flag = flag,
                None => log::warn!("Ignoring invalid DSCREEN_APPLICATION_FLAG: {}", val),
            }
        }

        if let Ok(val) = std::env::var("DSCREEN_BUNDLE_NAME") {
            if !val.is_empty() {
                self.bundle_name = Some(val);
            }
        }

        if let Ok(val) = std::env::var("DSCREEN_FIXTURE") {
            if !val.is_empty() {
                self.fixture_path = Some(PathBuf::from(val));
            }
        }

        self
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&json)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// File (when given) first, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.apply_env())
    }
}

/// Accepts either the numeric bit value or the snake_case name.
fn parse_flag(val: &str) -> Option<ApplicationFlag> {
    let trimmed = val.trim();
    let numeric = match trimmed.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u32>().ok(),
    };
    if let Some(bits) = numeric {
        return ApplicationFlag::from_bits(bits);
    }
    serde_json::from_value(serde_json::Value::String(trimmed.to_string())).ok()
}
