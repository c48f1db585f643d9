//! Contains the tab lookup the router needs when an event only names a tab or a window.
//! [TabMirror] is the main artifact of this module: it answers lookups from the events the
//! bridge already sent, so the tracker never has to call back into the browser.

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::daemon::events::{focused_window, BrowserEvent, Tab, TabId, WindowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowQuery {
    Window(WindowId),
    LastFocused,
}

/// Intended to serve as a contract any source of tab information must implement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TabProvider: Send + Sync {
    /// Fails when the tab is gone, for example closed right after being activated.
    async fn get(&self, tab_id: TabId) -> Result<Tab>;

    async fn query_active(&self, window: WindowQuery) -> Result<Option<Tab>>;
}

#[async_trait]
impl<T: TabProvider + ?Sized> TabProvider for std::sync::Arc<T> {
    async fn get(&self, tab_id: TabId) -> Result<Tab> {
        (**self).get(tab_id).await
    }

    async fn query_active(&self, window: WindowQuery) -> Result<Option<Tab>> {
        (**self).query_active(window).await
    }
}

#[derive(Default)]
struct MirrorState {
    tabs: BTreeMap<TabId, Tab>,
    last_focused: Option<WindowId>,
}

impl MirrorState {
    fn activate(&mut self, tab_id: TabId, window_id: WindowId) -> &mut Tab {
        for tab in self.tabs.values_mut().filter(|t| t.window_id == window_id) {
            tab.active = false;
        }
        let tab = self.tabs.entry(tab_id).or_insert_with(|| Tab {
            id: tab_id,
            window_id,
            url: None,
            active: true,
        });
        tab.window_id = window_id;
        tab.active = true;
        tab
    }

    fn active_in(&self, window_id: WindowId) -> Option<Tab> {
        self.tabs
            .values()
            .find(|t| t.active && t.window_id == window_id)
            .cloned()
    }
}

/// Model of the browser's tabs built from bridge events.
#[derive(Default)]
pub struct TabMirror {
    state: Mutex<MirrorState>,
}

impl TabMirror {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MirrorState> {
        // The state is plain data, a panic elsewhere can't leave it half updated.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Folds `event` into the mirror. Must be called before the event is routed.
    pub fn observe(&self, event: &BrowserEvent) {
        let mut state = self.lock();
        match event {
            BrowserEvent::TabActivated {
                tab_id,
                window_id,
                url,
            } => {
                let tab = state.activate(*tab_id, *window_id);
                if url.is_some() {
                    tab.url.clone_from(url);
                }
            }
            BrowserEvent::TabUpdated {
                tab_id,
                window_id,
                url,
                active,
                ..
            } => {
                if *active {
                    state.activate(*tab_id, *window_id);
                }
                let tab = state.tabs.entry(*tab_id).or_insert_with(|| Tab {
                    id: *tab_id,
                    window_id: *window_id,
                    url: None,
                    active: false,
                });
                tab.window_id = *window_id;
                if url.is_some() {
                    tab.url.clone_from(url);
                }
            }
            BrowserEvent::TabRemoved { tab_id } => {
                state.tabs.remove(tab_id);
            }
            BrowserEvent::WindowFocusChanged { window_id } => {
                if let Some(window_id) = focused_window(*window_id) {
                    state.last_focused = Some(window_id);
                }
            }
            BrowserEvent::Startup {
                tabs,
                focused_window,
            }
            | BrowserEvent::Installed {
                tabs,
                focused_window,
            } => {
                if !tabs.is_empty() {
                    state.tabs = tabs.iter().map(|t| (t.id, t.clone())).collect();
                }
                state.last_focused = focused_window.or(state.last_focused).or_else(|| {
                    state.tabs.values().find(|t| t.active).map(|t| t.window_id)
                });
            }
            BrowserEvent::IdleStateChanged { .. } | BrowserEvent::Alarm { .. } => {}
        }
    }
}

#[async_trait]
impl TabProvider for TabMirror {
    async fn get(&self, tab_id: TabId) -> Result<Tab> {
        self.lock()
            .tabs
            .get(&tab_id)
            .cloned()
            .ok_or_else(|| anyhow!("No tab with id {tab_id}"))
    }

    async fn query_active(&self, window: WindowQuery) -> Result<Option<Tab>> {
        let state = self.lock();
        Ok(match window {
            WindowQuery::Window(window_id) => state.active_in(window_id),
            WindowQuery::LastFocused => match state.last_focused {
                Some(window_id) => state.active_in(window_id),
                None => state.tabs.values().find(|t| t.active).cloned(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use crate::daemon::events::{BrowserEvent, LoadStatus, Tab, WINDOW_ID_NONE};

    use super::{TabMirror, TabProvider, WindowQuery};

    fn tab(id: i64, window_id: i64, url: &str, active: bool) -> Tab {
        Tab {
            id,
            window_id,
            url: Some(url.into()),
            active,
        }
    }

    fn startup_mirror() -> TabMirror {
        let mirror = TabMirror::new();
        mirror.observe(&BrowserEvent::Startup {
            tabs: vec![
                tab(1, 10, "https://a.com/", true),
                tab(2, 10, "https://b.com/", false),
                tab(3, 20, "https://c.com/", true),
            ],
            focused_window: Some(20),
        });
        mirror
    }

    #[tokio::test]
    async fn test_startup_snapshot() -> Result<()> {
        let mirror = startup_mirror();
        assert_eq!(
            mirror.query_active(WindowQuery::LastFocused).await?,
            Some(tab(3, 20, "https://c.com/", true))
        );
        assert_eq!(
            mirror.query_active(WindowQuery::Window(10)).await?,
            Some(tab(1, 10, "https://a.com/", true))
        );
        assert_eq!(mirror.query_active(WindowQuery::Window(99)).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_activation_moves_active_flag() -> Result<()> {
        let mirror = startup_mirror();
        mirror.observe(&BrowserEvent::TabActivated {
            tab_id: 2,
            window_id: 10,
            url: None,
        });

        assert!(!mirror.get(1).await?.active);
        assert_eq!(mirror.get(2).await?, tab(2, 10, "https://b.com/", true));
        assert!(mirror.get(3).await?.active);
        Ok(())
    }

    #[tokio::test]
    async fn test_activation_of_new_tab_keeps_its_url() -> Result<()> {
        let mirror = startup_mirror();
        mirror.observe(&BrowserEvent::TabActivated {
            tab_id: 5,
            window_id: 10,
            url: Some("chrome://newtab/".into()),
        });
        assert_eq!(mirror.get(5).await?, tab(5, 10, "chrome://newtab/", true));

        mirror.observe(&BrowserEvent::TabActivated {
            tab_id: 6,
            window_id: 10,
            url: None,
        });
        assert_eq!(mirror.get(6).await?.url, None);
        assert!(!mirror.get(5).await?.active);
        Ok(())
    }

    #[tokio::test]
    async fn test_updates_and_removal() -> Result<()> {
        let mirror = startup_mirror();
        mirror.observe(&BrowserEvent::TabUpdated {
            tab_id: 4,
            window_id: 20,
            status: Some(LoadStatus::Loading),
            url: Some("https://d.com/".into()),
            active: true,
        });
        mirror.observe(&BrowserEvent::TabUpdated {
            tab_id: 4,
            window_id: 20,
            status: Some(LoadStatus::Complete),
            url: None,
            active: true,
        });
        assert_eq!(mirror.get(4).await?, tab(4, 20, "https://d.com/", true));
        assert!(!mirror.get(3).await?.active);

        mirror.observe(&BrowserEvent::TabRemoved { tab_id: 4 });
        assert!(mirror.get(4).await.is_err());
        assert_eq!(mirror.query_active(WindowQuery::Window(20)).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_focus_tracks_last_focused_window() -> Result<()> {
        let mirror = startup_mirror();
        mirror.observe(&BrowserEvent::WindowFocusChanged { window_id: 10 });
        mirror.observe(&BrowserEvent::WindowFocusChanged {
            window_id: WINDOW_ID_NONE,
        });
        assert_eq!(
            mirror.query_active(WindowQuery::LastFocused).await?,
            Some(tab(1, 10, "https://a.com/", true))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_mirror() -> Result<()> {
        let mirror = TabMirror::new();
        assert!(mirror.get(1).await.is_err());
        assert_eq!(mirror.query_active(WindowQuery::LastFocused).await?, None);
        Ok(())
    }
}
