use serde::{Deserialize, Serialize};

/// OS account used when the caller does not name one.
pub const DEFAULT_USER_ID: i32 = 100;

/// A permission the caller wants. Deserializes from either `"ohos.permission.X"`
/// or `{ "name": "ohos.permission.X" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DescriptorRepr")]
pub struct PermissionDescriptor {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorRepr {
    Bare(String),
    Object { name: String },
}

impl From<DescriptorRepr> for PermissionDescriptor {
    fn from(repr: DescriptorRepr) -> Self {
        match repr {
            DescriptorRepr::Bare(name) | DescriptorRepr::Object { name } => Self { name },
        }
    }
}

impl PermissionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for PermissionDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PermissionDescriptor {
    fn from(name: String) -> Self {
        Self { name }
    }
}

/// How much detail the application info lookup returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationFlag {
    #[default]
    GetApplicationInfoDefault,
    WithPermission,
    WithMetadata,
    WithDisable,
}

impl ApplicationFlag {
    pub fn bits(self) -> u32 {
        match self {
            ApplicationFlag::GetApplicationInfoDefault => 0x0,
            ApplicationFlag::WithPermission => 0x1,
            ApplicationFlag::WithMetadata => 0x2,
            ApplicationFlag::WithDisable => 0x4,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x0 => Some(ApplicationFlag::GetApplicationInfoDefault),
            0x1 => Some(ApplicationFlag::WithPermission),
            0x2 => Some(ApplicationFlag::WithMetadata),
            0x4 => Some(ApplicationFlag::WithDisable),
            _ => None,
        }
    }
}

/// Input to one grant cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequest {
    #[serde(default)]
    pub permissions: Vec<PermissionDescriptor>,
    #[serde(default)]
    pub target_bundle_name: Option<String>,
    #[serde(default)]
    pub application_flag: Option<ApplicationFlag>,
    #[serde(default)]
    pub user_id: Option<i32>,
}

impl PermissionRequest {
    pub fn new<I, P>(permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionDescriptor>,
    {
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_bundle_name(mut self, bundle_name: impl Into<String>) -> Self {
        self.target_bundle_name = Some(bundle_name.into());
        self
    }

    pub fn with_application_flag(mut self, flag: ApplicationFlag) -> Self {
        self.application_flag = Some(flag);
        self
    }

    pub fn with_user_id(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Permission names in input order, first occurrence wins.
    pub fn unique_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.permissions.len());
        for descriptor in &self.permissions {
            if !names.iter().any(|n| n == &descriptor.name) {
                names.push(descriptor.name.clone());
            }
        }
        names
    }
}
