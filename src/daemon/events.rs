use serde::{Deserialize, Serialize};

pub type TabId = i64;
pub type WindowId = i64;

/// Window id the browser reports when focus moved away from every browser window.
pub const WINDOW_ID_NONE: WindowId = -1;

/// Name of the periodic alarm that commits long sessions in bounded chunks.
pub const SAVE_ALARM: &str = "sitetime-save";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Everything the browser tells the tracker. One JSON object per line, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
        /// The bridge sends it when the browser already knows it, e.g. `chrome://newtab/`.
        #[serde(default)]
        url: Option<String>,
    },
    TabUpdated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        status: Option<LoadStatus>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        active: bool,
    },
    TabRemoved {
        tab_id: TabId,
    },
    WindowFocusChanged {
        window_id: WindowId,
    },
    IdleStateChanged {
        state: IdleState,
    },
    Alarm {
        name: String,
    },
    Startup {
        #[serde(default)]
        tabs: Vec<Tab>,
        #[serde(default)]
        focused_window: Option<WindowId>,
    },
    Installed {
        #[serde(default)]
        tabs: Vec<Tab>,
        #[serde(default)]
        focused_window: Option<WindowId>,
    },
}

impl BrowserEvent {
    pub fn save_alarm() -> Self {
        BrowserEvent::Alarm {
            name: SAVE_ALARM.into(),
        }
    }
}

/// `None` when no browser window has focus.
pub fn focused_window(window_id: WindowId) -> Option<WindowId> {
    (window_id != WINDOW_ID_NONE).then_some(window_id)
}
