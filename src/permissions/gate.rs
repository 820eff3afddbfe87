use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::host::{AbilityContext, AccessTokenManager, BundleManager, GrantLog, GrantStatus, LogSink};
use super::request::{ApplicationFlag, PermissionRequest, DEFAULT_USER_ID};
use crate::config::AgentConfig;

/// Called once after every outcome is known.
pub type Completion = Box<dyn FnOnce() + Send>;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to resolve application info for {bundle_name}: {reason:#}")]
    IdentityLookup { bundle_name: String, reason: anyhow::Error },

    #[error("failed to check {permission}: {reason:#}")]
    AccessCheck { permission: String, reason: anyhow::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOutcome {
    AlreadyGranted,
    GrantSucceeded,
    GrantFailed,
}

impl PermissionOutcome {
    pub fn is_granted(self) -> bool {
        !matches!(self, PermissionOutcome::GrantFailed)
    }
}

/// Per-permission result of one grant cycle, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReport {
    pub outcomes: Vec<(String, PermissionOutcome)>,
    /// Whether the user was prompted at all.
    pub grant_requested: bool,
    /// The prompt returned nothing usable.
    pub grant_step_failed: bool,
}

impl GrantReport {
    pub fn outcome(&self, permission: &str) -> Option<PermissionOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == permission)
            .map(|(_, outcome)| *outcome)
    }

    pub fn already_granted(&self) -> Vec<&str> {
        self.names_with(|o| o == PermissionOutcome::AlreadyGranted)
    }

    pub fn granted(&self) -> Vec<&str> {
        self.names_with(|o| o == PermissionOutcome::GrantSucceeded)
    }

    pub fn denied(&self) -> Vec<&str> {
        self.names_with(|o| o == PermissionOutcome::GrantFailed)
    }

    pub fn all_granted(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_granted())
    }

    fn names_with(&self, pred: impl Fn(PermissionOutcome) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(*outcome))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn set(&mut self, permission: &str, outcome: PermissionOutcome) {
        if let Some(entry) = self.outcomes.iter_mut().find(|(name, _)| name == permission) {
            entry.1 = outcome;
        }
    }
}

/// Checks which permissions an application already holds and prompts the
/// user for the rest.
pub struct PermissionGate {
    bundles: Arc<dyn BundleManager>,
    tokens: Arc<dyn AccessTokenManager>,
    log: Arc<dyn GrantLog>,
    default_user_id: i32,
    default_flag: ApplicationFlag,
}

impl PermissionGate {
    pub fn new(bundles: Arc<dyn BundleManager>, tokens: Arc<dyn AccessTokenManager>) -> Self {
        Self {
            bundles,
            tokens,
            log: Arc::new(LogSink),
            default_user_id: DEFAULT_USER_ID,
            default_flag: ApplicationFlag::default(),
        }
    }

    pub fn with_log(mut self, log: Arc<dyn GrantLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_config(mut self, config: &AgentConfig) -> Self {
        self.default_user_id = config.default_user_id;
        self.default_flag = config.application_flag;
        self
    }

    /// Run one grant cycle.
    ///
    /// Identity lookup and access-check failures are returned and the
    /// completion is not called. A failed prompt is only logged: the pending
    /// permissions are reported as `GrantFailed` and `on_complete` still runs.
    pub async fn grant(
        &self,
        ctx: &dyn AbilityContext,
        request: &PermissionRequest,
        on_complete: Option<Completion>,
    ) -> Result<GrantReport, GateError> {
        self.log.info("permission grant start");

        let names = request.unique_names();
        if names.is_empty() {
            return Ok(self.finish(GrantReport::default(), on_complete));
        }

        let bundle_name = request
            .target_bundle_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ctx.bundle_name());
        let flag = request.application_flag.unwrap_or(self.default_flag);
        let user_id = request.user_id.unwrap_or(self.default_user_id);

        let info = match self.bundles.get_application_info(&bundle_name, flag, user_id).await {
            Ok(info) => info,
            Err(reason) => {
                self.log.error(&format!("application info lookup failed for {}: {:#}", bundle_name, reason));
                return Err(GateError::IdentityLookup { bundle_name, reason });
            }
        };
        let token = info.access_token();

        // try_join_all yields results in input order regardless of completion order.
        let checks = names.iter().map(|name| async move {
            self.tokens
                .check_access_token(token, name)
                .await
                .map(|status| (name, status))
                .map_err(|reason| GateError::AccessCheck {
                    permission: name.clone(),
                    reason,
                })
        });
        let statuses = match try_join_all(checks).await {
            Ok(statuses) => statuses,
            Err(e) => {
                self.log.error(&e.to_string());
                return Err(e);
            }
        };

        let mut report = GrantReport::default();
        let mut pending: Vec<String> = Vec::new();
        for (name, status) in statuses {
            match status {
                GrantStatus::Granted => {
                    self.log.info(&format!("{} is already granted", name));
                    report.outcomes.push((name.clone(), PermissionOutcome::AlreadyGranted));
                }
                GrantStatus::Denied => {
                    pending.push(name.clone());
                    report.outcomes.push((name.clone(), PermissionOutcome::GrantFailed));
                }
            }
        }

        if !pending.is_empty() {
            report.grant_requested = true;
            self.request_pending(ctx, &pending, &mut report).await;
        }

        Ok(self.finish(report, on_complete))
    }

    async fn request_pending(&self, ctx: &dyn AbilityContext, pending: &[String], report: &mut GrantReport) {
        let response = match ctx.request_permissions_from_user(pending).await {
            Ok(Some(response)) if !response.auth_results.is_empty() => response,
            Ok(_) => {
                self.log.error("permission grant failed: no result from user prompt");
                report.grant_step_failed = true;
                return;
            }
            Err(e) => {
                self.log.error(&format!("permission grant failed: {:#}", e));
                report.grant_step_failed = true;
                return;
            }
        };

        // auth_results[i] answers pending[i]; names in the response are not consulted.
        for (index, name) in pending.iter().enumerate() {
            match response.auth_results.get(index) {
                Some(0) => {
                    self.log.info(&format!("permission grant succeeded: {}", name));
                    report.set(name, PermissionOutcome::GrantSucceeded);
                }
                Some(code) => {
                    self.log.error(&format!("permission grant failed: {} (code {})", name, code));
                }
                None => {
                    self.log.error(&format!("permission grant failed: {} (no result)", name));
                }
            }
        }
    }

    fn finish(&self, report: GrantReport, on_complete: Option<Completion>) -> GrantReport {
        self.log.info("permission grant end");
        if let Some(callback) = on_complete {
            callback();
        }
        report
    }
}
