//! A host described by a JSON document, so the gate can run off-device.
//!
//! ```json
//! {
//!   "bundle_name": "com.example.dscreen",
//!   "applications": [{ "bundle_name": "com.example.dscreen", "access_token_id": 537 }],
//!   "granted": ["ohos.permission.DISTRIBUTED_DATASYNC"],
//!   "prompt": { "ohos.permission.CAPTURE_SCREEN": 0 }
//! }
//! ```
//!
//! Permissions missing from `prompt` are answered with -1. With
//! `"prompt_available": false` the prompt returns no response at all.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::host::{
    AbilityContext, AccessToken, AccessTokenManager, ApplicationInfo, BundleManager, GrantResponse, GrantStatus,
};
use super::request::ApplicationFlag;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub bundle_name: String,
    #[serde(default)]
    pub applications: Vec<ApplicationInfo>,
    #[serde(default)]
    pub granted: Vec<String>,
    #[serde(default)]
    pub prompt: HashMap<String, i32>,
    #[serde(default = "default_true")]
    pub prompt_available: bool,
}

#[derive(Debug)]
pub struct FixtureHost {
    spec: FixtureSpec,
    granted: Mutex<Vec<String>>,
    prompts: Mutex<Vec<Vec<String>>>,
}

impl FixtureHost {
    pub fn new(spec: FixtureSpec) -> Self {
        let granted = spec.granted.clone();
        Self {
            spec,
            granted: Mutex::new(granted),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let spec: FixtureSpec = serde_json::from_str(json).context("invalid fixture document")?;
        Ok(Self::new(spec))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Every prompt issued so far, in order.
    pub fn prompts(&self) -> Vec<Vec<String>> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn find_application(&self, bundle_name: &str) -> Option<&ApplicationInfo> {
        self.spec.applications.iter().find(|app| app.bundle_name == bundle_name)
    }
}

#[async_trait]
impl BundleManager for FixtureHost {
    async fn get_application_info(
        &self,
        bundle_name: &str,
        _flag: ApplicationFlag,
        user_id: i32,
    ) -> Result<ApplicationInfo> {
        self.find_application(bundle_name)
            .cloned()
            .ok_or_else(|| anyhow!("bundle {} is not installed for user {}", bundle_name, user_id))
    }
}

#[async_trait]
impl AccessTokenManager for FixtureHost {
    async fn check_access_token(&self, token: AccessToken, permission: &str) -> Result<GrantStatus> {
        if !self.spec.applications.iter().any(|app| app.access_token() == token) {
            return Err(anyhow!("unknown access token {}", token.0));
        }
        let granted = self.granted.lock().map_err(|_| anyhow!("fixture state poisoned"))?;
        Ok(if granted.iter().any(|p| p == permission) {
            GrantStatus::Granted
        } else {
            GrantStatus::Denied
        })
    }
}

#[async_trait]
impl AbilityContext for FixtureHost {
    fn bundle_name(&self) -> String {
        self.spec.bundle_name.clone()
    }

    async fn request_permissions_from_user(&self, permissions: &[String]) -> Result<Option<GrantResponse>> {
        self.prompts
            .lock()
            .map_err(|_| anyhow!("fixture state poisoned"))?
            .push(permissions.to_vec());

        if !self.spec.prompt_available {
            return Ok(None);
        }

        let auth_results: Vec<i32> = permissions
            .iter()
            .map(|p| self.spec.prompt.get(p).copied().unwrap_or(-1))
            .collect();

        let mut granted = self.granted.lock().map_err(|_| anyhow!("fixture state poisoned"))?;
        for (permission, code) in permissions.iter().zip(&auth_results) {
            if *code == 0 && !granted.contains(permission) {
                granted.push(permission.clone());
            }
        }

        Ok(Some(GrantResponse {
            permissions: permissions.to_vec(),
            auth_results,
        }))
    }
}
