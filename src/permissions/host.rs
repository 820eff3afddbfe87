use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::request::ApplicationFlag;

/// Opaque security principal of an installed application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessToken(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub bundle_name: String,
    pub access_token_id: u32,
}

impl ApplicationInfo {
    pub fn access_token(&self) -> AccessToken {
        AccessToken(self.access_token_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantStatus {
    Granted,
    Denied,
}

impl GrantStatus {
    /// 0 is granted; every other code is treated as denied.
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            GrantStatus::Granted
        } else {
            GrantStatus::Denied
        }
    }
}

/// Answer to an interactive prompt. `auth_results[i]` belongs to the i-th
/// permission that was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResponse {
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub auth_results: Vec<i32>,
}

#[async_trait]
pub trait BundleManager: Send + Sync {
    async fn get_application_info(
        &self,
        bundle_name: &str,
        flag: ApplicationFlag,
        user_id: i32,
    ) -> Result<ApplicationInfo>;
}

#[async_trait]
pub trait AccessTokenManager: Send + Sync {
    async fn check_access_token(&self, token: AccessToken, permission: &str) -> Result<GrantStatus>;
}

/// The caller's execution context.
#[async_trait]
pub trait AbilityContext: Send + Sync {
    fn bundle_name(&self) -> String;

    /// Prompt the user for `permissions`. `Ok(None)` means the host gave no
    /// usable answer.
    async fn request_permissions_from_user(&self, permissions: &[String]) -> Result<Option<GrantResponse>>;
}

/// Diagnostic sink for the grant flow.
pub trait GrantLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl GrantLog for LogSink {
    fn info(&self, message: &str) {
        log::info!(target: "permission_gate", "{}", message);
    }

    fn error(&self, message: &str) {
        log::error!(target: "permission_gate", "{}", message);
    }
}
