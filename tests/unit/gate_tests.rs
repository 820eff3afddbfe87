#[cfg(test)]
mod gate_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use dscreen_agent_lib::config::AgentConfig;
    use dscreen_agent_lib::permissions::{
        AbilityContext, AccessToken, AccessTokenManager, ApplicationFlag, ApplicationInfo, BundleManager,
        GateError, GrantLog, GrantResponse, GrantStatus, PermissionGate, PermissionOutcome, PermissionRequest,
    };

    const TOKEN: u32 = 537_001;

    #[derive(Clone)]
    enum Prompt {
        Codes(Vec<i32>),
        Empty,
        Fails,
    }

    struct ScriptedHost {
        own_bundle: String,
        lookup_fails: bool,
        granted: Vec<String>,
        /// Per-permission check latency in ms; later inputs can finish first.
        check_delay_ms: HashMap<String, u64>,
        failing_check: Option<String>,
        prompt: Prompt,
        lookups: Mutex<Vec<(String, ApplicationFlag, i32)>>,
        prompts: Mutex<Vec<Vec<String>>>,
        check_order: Mutex<Vec<String>>,
    }

    impl ScriptedHost {
        fn new(granted: &[&str], prompt: Prompt) -> Self {
            Self {
                own_bundle: "com.example.dscreen".to_string(),
                lookup_fails: false,
                granted: granted.iter().map(|s| s.to_string()).collect(),
                check_delay_ms: HashMap::new(),
                failing_check: None,
                prompt,
                lookups: Mutex::new(Vec::new()),
                prompts: Mutex::new(Vec::new()),
                check_order: Mutex::new(Vec::new()),
            }
        }

        fn prompts(&self) -> Vec<Vec<String>> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BundleManager for ScriptedHost {
        async fn get_application_info(
            &self,
            bundle_name: &str,
            flag: ApplicationFlag,
            user_id: i32,
        ) -> Result<ApplicationInfo> {
            self.lookups.lock().unwrap().push((bundle_name.to_string(), flag, user_id));
            if self.lookup_fails {
                return Err(anyhow!("bundle {} not found", bundle_name));
            }
            Ok(ApplicationInfo {
                bundle_name: bundle_name.to_string(),
                access_token_id: TOKEN,
            })
        }
    }

    #[async_trait]
    impl AccessTokenManager for ScriptedHost {
        async fn check_access_token(&self, token: AccessToken, permission: &str) -> Result<GrantStatus> {
            assert_eq!(token, AccessToken(TOKEN));
            if let Some(ms) = self.check_delay_ms.get(permission) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.check_order.lock().unwrap().push(permission.to_string());
            if self.failing_check.as_deref() == Some(permission) {
                return Err(anyhow!("access service unavailable"));
            }
            Ok(if self.granted.iter().any(|g| g == permission) {
                GrantStatus::Granted
            } else {
                GrantStatus::Denied
            })
        }
    }

    #[async_trait]
    impl AbilityContext for ScriptedHost {
        fn bundle_name(&self) -> String {
            self.own_bundle.clone()
        }

        async fn request_permissions_from_user(&self, permissions: &[String]) -> Result<Option<GrantResponse>> {
            self.prompts.lock().unwrap().push(permissions.to_vec());
            match &self.prompt {
                Prompt::Codes(codes) => Ok(Some(GrantResponse {
                    permissions: permissions.to_vec(),
                    auth_results: codes.clone(),
                })),
                Prompt::Empty => Ok(None),
                Prompt::Fails => Err(anyhow!("ability is not in foreground")),
            }
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        entries: Mutex<Vec<(&'static str, String)>>,
    }

    impl RecordingLog {
        fn errors(&self) -> Vec<String> {
            self.entries
                .lock()
                .unwrap()
                .iter()
                .filter(|(level, _)| *level == "error")
                .map(|(_, msg)| msg.clone())
                .collect()
        }

        fn contains(&self, needle: &str) -> bool {
            self.entries.lock().unwrap().iter().any(|(_, msg)| msg.contains(needle))
        }
    }

    impl GrantLog for RecordingLog {
        fn info(&self, message: &str) {
            self.entries.lock().unwrap().push(("info", message.to_string()));
        }

        fn error(&self, message: &str) {
            self.entries.lock().unwrap().push(("error", message.to_string()));
        }
    }

    fn gate_for(host: &Arc<ScriptedHost>, log: &Arc<RecordingLog>) -> PermissionGate {
        PermissionGate::new(host.clone(), host.clone()).with_log(log.clone())
    }

    fn counting_callback() -> (Arc<AtomicUsize>, Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, Box::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[tokio::test]
    async fn test_granted_and_pending_example() {
        let host = Arc::new(ScriptedHost::new(&["perm.A"], Prompt::Codes(vec![0])));
        let log = Arc::new(RecordingLog::default());
        let (calls, callback) = counting_callback();

        let request = PermissionRequest::new(["perm.A", "perm.B"]);
        let report = gate_for(&host, &log)
            .grant(host.as_ref(), &request, Some(callback))
            .await
            .unwrap();

        assert_eq!(report.outcome("perm.A"), Some(PermissionOutcome::AlreadyGranted));
        assert_eq!(report.outcome("perm.B"), Some(PermissionOutcome::GrantSucceeded));
        assert_eq!(host.prompts(), vec![vec!["perm.B".to_string()]]);
        assert!(report.grant_requested);
        assert!(!report.grant_step_failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(log.contains("perm.A is already granted"));
        assert!(log.contains("permission grant start"));
        assert!(log.contains("permission grant end"));
    }

    #[tokio::test]
    async fn test_results_follow_request_order_despite_out_of_order_checks() {
        let mut host = ScriptedHost::new(&[], Prompt::Codes(vec![0, -1, 0]));
        // A finishes last, C first.
        host.check_delay_ms.insert("perm.A".to_string(), 60);
        host.check_delay_ms.insert("perm.B".to_string(), 30);
        let host = Arc::new(host);
        let log = Arc::new(RecordingLog::default());

        let request = PermissionRequest::new(["perm.A", "perm.B", "perm.C"]);
        let report = gate_for(&host, &log).grant(host.as_ref(), &request, None).await.unwrap();

        assert_eq!(host.check_order.lock().unwrap().clone(), vec!["perm.C", "perm.B", "perm.A"]);
        assert_eq!(
            host.prompts(),
            vec![vec!["perm.A".to_string(), "perm.B".to_string(), "perm.C".to_string()]]
        );
        assert_eq!(report.outcome("perm.A"), Some(PermissionOutcome::GrantSucceeded));
        assert_eq!(report.outcome("perm.B"), Some(PermissionOutcome::GrantFailed));
        assert_eq!(report.outcome("perm.C"), Some(PermissionOutcome::GrantSucceeded));
        let names: Vec<&str> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["perm.A", "perm.B", "perm.C"]);
    }

    #[tokio::test]
    async fn test_all_granted_never_prompts() {
        let host = Arc::new(ScriptedHost::new(&["perm.A", "perm.B"], Prompt::Fails));
        let log = Arc::new(RecordingLog::default());
        let (calls, callback) = counting_callback();

        let request = PermissionRequest::new(["perm.A", "perm.B"]);
        let report = gate_for(&host, &log)
            .grant(host.as_ref(), &request, Some(callback))
            .await
            .unwrap();

        assert!(host.prompts().is_empty());
        assert!(!report.grant_requested);
        assert_eq!(report.already_granted(), vec!["perm.A", "perm.B"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_identity_lookup_failure_aborts_before_checks() {
        let mut host = ScriptedHost::new(&[], Prompt::Codes(vec![0]));
        host.lookup_fails = true;
        let host = Arc::new(host);
        let log = Arc::new(RecordingLog::default());
        let (calls, callback) = counting_callback();

        let request = PermissionRequest::new(["perm.A"]);
        let result = gate_for(&host, &log).grant(host.as_ref(), &request, Some(callback)).await;

        assert!(matches!(result, Err(GateError::IdentityLookup { ref bundle_name, .. }) if bundle_name == "com.example.dscreen"));
        assert!(host.check_order.lock().unwrap().is_empty());
        assert!(host.prompts().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_check_aborts_grant_step() {
        let mut host = ScriptedHost::new(&[], Prompt::Codes(vec![0, 0]));
        host.failing_check = Some("perm.B".to_string());
        let host = Arc::new(host);
        let log = Arc::new(RecordingLog::default());

        let request = PermissionRequest::new(["perm.A", "perm.B"]);
        let result = gate_for(&host, &log).grant(host.as_ref(), &request, None).await;

        assert!(matches!(result, Err(GateError::AccessCheck { ref permission, .. }) if permission == "perm.B"));
        assert!(host.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_absent_response_is_logged_and_still_completes() {
        let host = Arc::new(ScriptedHost::new(&["perm.A"], Prompt::Empty));
        let log = Arc::new(RecordingLog::default());
        let (calls, callback) = counting_callback();

        let request = PermissionRequest::new(["perm.A", "perm.B", "perm.C"]);
        let report = gate_for(&host, &log)
            .grant(host.as_ref(), &request, Some(callback))
            .await
            .unwrap();

        assert!(report.grant_step_failed);
        assert_eq!(report.outcome("perm.A"), Some(PermissionOutcome::AlreadyGranted));
        assert_eq!(report.denied(), vec!["perm.B", "perm.C"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // One generic line, nothing per permission.
        assert_eq!(log.errors().len(), 1);
        assert!(!log.errors()[0].contains("perm.B"));
    }

    #[tokio::test]
    async fn test_prompt_error_is_absorbed() {
        let host = Arc::new(ScriptedHost::new(&[], Prompt::Fails));
        let log = Arc::new(RecordingLog::default());
        let (calls, callback) = counting_callback();

        let request = PermissionRequest::new(["perm.A"]);
        let report = gate_for(&host, &log)
            .grant(host.as_ref(), &request, Some(callback))
            .await
            .unwrap();

        assert!(report.grant_step_failed);
        assert_eq!(report.outcome("perm.A"), Some(PermissionOutcome::GrantFailed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(log.contains("not in foreground"));
    }

    #[tokio::test]
    async fn test_non_zero_codes_are_failures() {
        let host = Arc::new(ScriptedHost::new(&[], Prompt::Codes(vec![2, -1, 0])));
        let log = Arc::new(RecordingLog::default());

        let request = PermissionRequest::new(["perm.A", "perm.B", "perm.C"]);
        let report = gate_for(&host, &log).grant(host.as_ref(), &request, None).await.unwrap();

        assert_eq!(report.denied(), vec!["perm.A", "perm.B"]);
        assert_eq!(report.granted(), vec!["perm.C"]);
    }

    #[tokio::test]
    async fn test_short_response_marks_missing_as_failed() {
        let host = Arc::new(ScriptedHost::new(&[], Prompt::Codes(vec![0])));
        let log = Arc::new(RecordingLog::default());

        let request = PermissionRequest::new(["perm.A", "perm.B"]);
        let report = gate_for(&host, &log).grant(host.as_ref(), &request, None).await.unwrap();

        assert_eq!(report.outcome("perm.A"), Some(PermissionOutcome::GrantSucceeded));
        assert_eq!(report.outcome("perm.B"), Some(PermissionOutcome::GrantFailed));
        assert!(!report.grant_step_failed);
    }

    #[tokio::test]
    async fn test_every_permission_reported_once() {
        let host = Arc::new(ScriptedHost::new(&["perm.B"], Prompt::Codes(vec![0, 0])));
        let log = Arc::new(RecordingLog::default());

        let request = PermissionRequest::new(["perm.A", "perm.B", "perm.A", "perm.C"]);
        let report = gate_for(&host, &log).grant(host.as_ref(), &request, None).await.unwrap();

        let names: Vec<&str> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["perm.A", "perm.B", "perm.C"]);
        assert_eq!(host.prompts(), vec![vec!["perm.A".to_string(), "perm.C".to_string()]]);
    }

    #[tokio::test]
    async fn test_empty_request_is_noop() {
        let host = Arc::new(ScriptedHost::new(&[], Prompt::Codes(vec![])));
        let log = Arc::new(RecordingLog::default());
        let (calls, callback) = counting_callback();

        let report = gate_for(&host, &log)
            .grant(host.as_ref(), &PermissionRequest::default(), Some(callback))
            .await
            .unwrap();

        assert!(report.outcomes.is_empty());
        assert!(host.lookups.lock().unwrap().is_empty());
        assert!(host.prompts().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lookup_defaults_and_overrides() {
        let host = Arc::new(ScriptedHost::new(&["perm.A"], Prompt::Codes(vec![])));
        let log = Arc::new(RecordingLog::default());

        let config = AgentConfig {
            default_user_id: 101,
            ..AgentConfig::default()
        };
        let gate = gate_for(&host, &log).with_config(&config);

        gate.grant(host.as_ref(), &PermissionRequest::new(["perm.A"]), None)
            .await
            .unwrap();
        let request = PermissionRequest::new(["perm.A"])
            .with_bundle_name("com.example.other")
            .with_application_flag(ApplicationFlag::WithPermission)
            .with_user_id(102);
        gate.grant(host.as_ref(), &request, None).await.unwrap();
        // An empty bundle name falls back to the host's.
        gate.grant(host.as_ref(), &PermissionRequest::new(["perm.A"]).with_bundle_name(""), None)
            .await
            .unwrap();

        let lookups = host.lookups.lock().unwrap().clone();
        assert_eq!(
            lookups,
            vec![
                ("com.example.dscreen".to_string(), ApplicationFlag::GetApplicationInfoDefault, 101),
                ("com.example.other".to_string(), ApplicationFlag::WithPermission, 102),
                ("com.example.dscreen".to_string(), ApplicationFlag::GetApplicationInfoDefault, 101),
            ]
        );
    }

    #[tokio::test]
    async fn test_fixture_host_end_to_end() {
        use dscreen_agent_lib::permissions::fixture::FixtureHost;

        let host = Arc::new(
            FixtureHost::from_json(
                r#"{
                    "bundle_name": "com.example.dscreen",
                    "applications": [{ "bundle_name": "com.example.dscreen", "access_token_id": 9 }],
                    "granted": ["ohos.permission.DISTRIBUTED_DATASYNC"],
                    "prompt": { "ohos.permission.CAPTURE_SCREEN": 0 }
                }"#,
            )
            .unwrap(),
        );
        let gate = PermissionGate::new(host.clone(), host.clone());

        let request = dscreen_agent_lib::permissions::distributed_screen_request();
        let report = gate.grant(host.as_ref(), &request, None).await.unwrap();

        assert_eq!(report.already_granted(), vec!["ohos.permission.DISTRIBUTED_DATASYNC"]);
        assert_eq!(report.granted(), vec!["ohos.permission.CAPTURE_SCREEN"]);
        assert_eq!(report.denied(), vec!["ohos.permission.ACCESS_SERVICE_DM"]);

        // The second cycle sees the grant from the first.
        let again = gate.grant(host.as_ref(), &request, None).await.unwrap();
        assert_eq!(again.already_granted().len(), 2);
        assert_eq!(host.prompts().len(), 2);
    }
}
