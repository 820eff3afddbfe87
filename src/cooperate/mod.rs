//! Screen hopping (cooperate) contract between two connected devices.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::screen::ContractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooperateState {
    CooperatePrepare = 0,
    CooperateUnprepare = 1,
    CooperateActivate = 2,
    CooperateActivateSuccess = 3,
    CooperateActivateFailure = 4,
    CooperateDeactivateSuccess = 5,
    CooperateDeactivateFailure = 6,
    CooperateSessionDisconnected = 7,
}

impl CooperateState {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CooperateState::CooperateActivateFailure
                | CooperateState::CooperateDeactivateFailure
                | CooperateState::CooperateSessionDisconnected
        )
    }

    /// Input is currently hopping to the peer.
    pub fn is_active(self) -> bool {
        self == CooperateState::CooperateActivateSuccess
    }
}

impl TryFrom<i32> for CooperateState {
    type Error = ContractError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CooperateState::CooperatePrepare),
            1 => Ok(CooperateState::CooperateUnprepare),
            2 => Ok(CooperateState::CooperateActivate),
            3 => Ok(CooperateState::CooperateActivateSuccess),
            4 => Ok(CooperateState::CooperateActivateFailure),
            5 => Ok(CooperateState::CooperateDeactivateSuccess),
            6 => Ok(CooperateState::CooperateDeactivateFailure),
            7 => Ok(CooperateState::CooperateSessionDisconnected),
            _ => Err(ContractError::UnknownValue { kind: "cooperate state", value }),
        }
    }
}

/// Older notification codes. Same numbering as [`CooperateState`].
#[deprecated(note = "use CooperateState")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooperateMsg {
    CooperatePrepare = 0,
    CooperateUnprepare = 1,
    CooperateActivate = 2,
    CooperateActivateSuccess = 3,
    CooperateActivateFail = 4,
    CooperateDeactivateSuccess = 5,
    CooperateDeactivateFail = 6,
    CooperateSessionDisconnected = 7,
}

#[allow(deprecated)]
impl From<CooperateMsg> for CooperateState {
    fn from(msg: CooperateMsg) -> Self {
        match msg {
            CooperateMsg::CooperatePrepare => CooperateState::CooperatePrepare,
            CooperateMsg::CooperateUnprepare => CooperateState::CooperateUnprepare,
            CooperateMsg::CooperateActivate => CooperateState::CooperateActivate,
            CooperateMsg::CooperateActivateSuccess => CooperateState::CooperateActivateSuccess,
            CooperateMsg::CooperateActivateFail => CooperateState::CooperateActivateFailure,
            CooperateMsg::CooperateDeactivateSuccess => CooperateState::CooperateDeactivateSuccess,
            CooperateMsg::CooperateDeactivateFail => CooperateState::CooperateDeactivateFailure,
            CooperateMsg::CooperateSessionDisconnected => CooperateState::CooperateSessionDisconnected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooperateMessage {
    pub network_id: String,
    pub state: CooperateState,
}

/// Pointer position on the peer's display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseLocation {
    pub display_x: i32,
    pub display_y: i32,
    pub display_width: u32,
    pub display_height: u32,
}

#[async_trait]
pub trait CooperateService: Send + Sync {
    async fn prepare(&self) -> Result<()>;

    async fn unprepare(&self) -> Result<()>;

    async fn activate(&self, target_network_id: &str, input_device_id: i32) -> Result<()>;

    /// `is_unchained` also tears down the link to the peer.
    async fn deactivate(&self, is_unchained: bool) -> Result<()>;

    async fn get_cooperate_switch_state(&self, network_id: &str) -> Result<bool>;

    fn subscribe_messages(&self) -> broadcast::Receiver<CooperateMessage>;

    fn subscribe_mouse(&self, network_id: &str) -> broadcast::Receiver<MouseLocation>;
}
