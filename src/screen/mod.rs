//! Screen manager contract.
//!
//! Types mirror what the platform display service hands out. The service
//! itself lives on the device; this crate only talks to it through
//! [`ScreenManager`].

pub mod expand;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

pub use expand::{expand_layout, ExpandError, ExpandSession};

pub type ScreenId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("unknown {kind} value {value}")]
    UnknownValue { kind: &'static str, value: i32 },

    #[error("invalid virtual screen option: {0}")]
    InvalidOption(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Unspecified = 0,
    Vertical = 1,
    Horizontal = 2,
    ReverseVertical = 3,
    ReverseHorizontal = 4,
}

impl TryFrom<i32> for Orientation {
    type Error = ContractError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Orientation::Unspecified),
            1 => Ok(Orientation::Vertical),
            2 => Ok(Orientation::Horizontal),
            3 => Ok(Orientation::ReverseVertical),
            4 => Ok(Orientation::ReverseHorizontal),
            _ => Err(ContractError::UnknownValue { kind: "orientation", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenSourceMode {
    #[default]
    ScreenMain = 0,
    ScreenMirror = 1,
    ScreenExtend = 2,
    ScreenAlone = 3,
}

impl TryFrom<i32> for ScreenSourceMode {
    type Error = ContractError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ScreenSourceMode::ScreenMain),
            1 => Ok(ScreenSourceMode::ScreenMirror),
            2 => Ok(ScreenSourceMode::ScreenExtend),
            3 => Ok(ScreenSourceMode::ScreenAlone),
            _ => Err(ContractError::UnknownValue { kind: "screen source mode", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenModeInfo {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    pub id: ScreenId,
    pub parent: ScreenId,
    /// Remote screens carry the peer device's identity in their name.
    pub name: String,
    /// `false` for screens backed by a remote device.
    pub is_real: bool,
    pub supported_mode_info: Vec<ScreenModeInfo>,
    pub active_mode_index: usize,
    pub orientation: Orientation,
    pub source_mode: ScreenSourceMode,
}

impl Screen {
    pub fn active_mode(&self) -> Option<&ScreenModeInfo> {
        self.supported_mode_info.get(self.active_mode_index)
    }

    pub fn is_remote(&self) -> bool {
        !self.is_real
    }
}

/// Where a screen sits in an expand group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandOption {
    pub screen_id: ScreenId,
    pub start_x: u32,
    pub start_y: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualScreenOption {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub density: f32,
    pub surface_id: String,
}

impl VirtualScreenOption {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.name.trim().is_empty() {
            return Err(ContractError::InvalidOption("name is empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ContractError::InvalidOption(format!(
                "size {}x{} is empty",
                self.width, self.height
            )));
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ContractError::InvalidOption(format!("density {} is not positive", self.density)));
        }
        Ok(())
    }
}

/// The display a screen is currently presenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub screen_id: ScreenId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "screen_id", rename_all = "snake_case")]
pub enum ScreenEvent {
    Connect(ScreenId),
    Disconnect(ScreenId),
    Change(ScreenId),
}

impl ScreenEvent {
    pub fn screen_id(&self) -> ScreenId {
        match self {
            ScreenEvent::Connect(id) | ScreenEvent::Disconnect(id) | ScreenEvent::Change(id) => *id,
        }
    }
}

#[async_trait]
pub trait ScreenManager: Send + Sync {
    async fn get_all_screens(&self) -> Result<Vec<Screen>>;

    async fn default_display(&self) -> Result<DisplayInfo>;

    /// Returns the id of the new expand group.
    async fn make_expand(&self, options: &[ExpandOption]) -> Result<ScreenId>;

    async fn stop_expand(&self, expand_screens: &[ScreenId]) -> Result<()>;

    /// Returns the id of the new mirror group.
    async fn make_mirror(&self, main_screen: ScreenId, mirror_screens: &[ScreenId]) -> Result<ScreenId>;

    async fn stop_mirror(&self, mirror_screens: &[ScreenId]) -> Result<()>;

    async fn create_virtual_screen(&self, options: &VirtualScreenOption) -> Result<Screen>;

    async fn destroy_virtual_screen(&self, screen_id: ScreenId) -> Result<()>;

    async fn set_virtual_screen_surface(&self, screen_id: ScreenId, surface_id: &str) -> Result<()>;

    async fn is_screen_rotation_locked(&self) -> Result<bool>;

    async fn set_screen_rotation_locked(&self, locked: bool) -> Result<()>;

    async fn set_orientation(&self, screen_id: ScreenId, orientation: Orientation) -> Result<()>;

    async fn set_screen_active_mode(&self, screen_id: ScreenId, mode_index: usize) -> Result<()>;

    async fn set_density_dpi(&self, screen_id: ScreenId, density_dpi: u32) -> Result<()>;

    /// Connect, disconnect and change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ScreenEvent>;
}
