pub mod fixture;
pub mod gate;
pub mod host;
pub mod request;

pub use gate::{Completion, GateError, GrantReport, PermissionGate, PermissionOutcome};
pub use host::{
    AbilityContext, AccessToken, AccessTokenManager, ApplicationInfo, BundleManager, GrantLog, GrantResponse,
    GrantStatus, LogSink,
};
pub use request::{ApplicationFlag, PermissionDescriptor, PermissionRequest, DEFAULT_USER_ID};

/// Permissions the distributed screen flow needs before it can mirror or
/// expand onto a remote device.
pub const DISTRIBUTED_SCREEN_PERMISSIONS: &[&str] = &[
    "ohos.permission.DISTRIBUTED_DATASYNC",
    "ohos.permission.CAPTURE_SCREEN",
    "ohos.permission.ACCESS_SERVICE_DM",
];

/// Request for every permission in [`DISTRIBUTED_SCREEN_PERMISSIONS`].
pub fn distributed_screen_request() -> PermissionRequest {
    PermissionRequest::new(DISTRIBUTED_SCREEN_PERMISSIONS.iter().copied())
}
