use thiserror::Error;

use super::{DisplayInfo, ExpandOption, Screen, ScreenId, ScreenManager};

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("no remote screen is connected")]
    NoRemoteScreen,

    #[error("screen manager call {call} failed: {reason:#}")]
    Manager { call: &'static str, reason: anyhow::Error },
}

fn manager_err(call: &'static str) -> impl FnOnce(anyhow::Error) -> ExpandError {
    move |reason| ExpandError::Manager { call, reason }
}

/// Local display at the origin, remote screen directly to its right.
pub fn expand_layout(local: &DisplayInfo, remote: ScreenId) -> [ExpandOption; 2] {
    [
        ExpandOption {
            screen_id: local.screen_id,
            start_x: 0,
            start_y: 0,
        },
        ExpandOption {
            screen_id: remote,
            start_x: local.width,
            start_y: 0,
        },
    ]
}

/// First screen backed by a remote device, in enumeration order.
pub fn first_remote_screen(screens: &[Screen]) -> Option<&Screen> {
    screens.iter().find(|screen| screen.is_remote())
}

/// An expand group spanning the local display and one remote screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandSession {
    pub local_screen_id: ScreenId,
    pub remote_screen_id: ScreenId,
    pub remote_screen_name: String,
    pub group_id: ScreenId,
}

impl ExpandSession {
    pub async fn start(manager: &dyn ScreenManager) -> Result<Self, ExpandError> {
        let screens = manager.get_all_screens().await.map_err(manager_err("get_all_screens"))?;
        let remote = first_remote_screen(&screens).ok_or(ExpandError::NoRemoteScreen)?;
        log::info!("Remote screen selected: {} ({})", remote.id, remote.name);

        let display = manager.default_display().await.map_err(manager_err("default_display"))?;
        log::info!("Local screen: {} ({}x{})", display.screen_id, display.width, display.height);

        let options = expand_layout(&display, remote.id);
        let group_id = manager.make_expand(&options).await.map_err(manager_err("make_expand"))?;
        log::info!("Expand group {} started", group_id);

        Ok(Self {
            local_screen_id: display.screen_id,
            remote_screen_id: remote.id,
            remote_screen_name: remote.name.clone(),
            group_id,
        })
    }

    pub async fn stop(&self, manager: &dyn ScreenManager) -> Result<(), ExpandError> {
        manager
            .stop_expand(&[self.remote_screen_id])
            .await
            .map_err(manager_err("stop_expand"))?;
        log::info!("Expand group {} stopped", self.group_id);
        Ok(())
    }
}
