use anyhow::Result;
use tracing::debug;

use crate::daemon::{
    collection::tabs::{TabProvider, WindowQuery},
    events::{focused_window, BrowserEvent, IdleState, LoadStatus, Tab, SAVE_ALARM},
    storage::kv::KeyValueStore,
    tracker::Tracker,
};

use super::module::EventProcessor;

/// Maps every browser event to its sequence of tracker calls.
///
/// | event                          | sequence                           |
/// |--------------------------------|------------------------------------|
/// | tab activated                  | commit, look up tab, start         |
/// | tab finished loading (active)  | commit, start                      |
/// | focus lost                     | commit, pause                      |
/// | focus gained                   | active tab of the window, start    |
/// | idle or locked                 | commit, pause                      |
/// | active again                   | active tab of last window, start   |
/// | save alarm                     | commit, restart timer              |
/// | startup or install             | active tab of last window, start   |
///
/// A looked up tab without a url pauses the timer, its time belongs to no site yet.
pub struct EventRouter<S, T> {
    tracker: Tracker<S>,
    tabs: T,
}

impl<S: KeyValueStore, T: TabProvider> EventRouter<S, T> {
    pub fn new(tracker: Tracker<S>, tabs: T) -> Self {
        Self { tracker, tabs }
    }

    pub fn tracker(&self) -> &Tracker<S> {
        &self.tracker
    }

    pub async fn dispatch(&self, event: BrowserEvent) -> Result<()> {
        match event {
            BrowserEvent::TabActivated { tab_id, .. } => {
                self.commit().await?;
                self.track_tab(self.tabs.get(tab_id).await.map(Some)).await
            }
            BrowserEvent::TabUpdated {
                status: Some(LoadStatus::Complete),
                active: true,
                url: Some(url),
                ..
            } if !url.is_empty() => {
                self.commit().await?;
                self.tracker.start_tracking(&url).await
            }
            BrowserEvent::TabUpdated { .. } | BrowserEvent::TabRemoved { .. } => Ok(()),
            BrowserEvent::WindowFocusChanged { window_id } => match focused_window(window_id) {
                None => {
                    self.commit().await?;
                    self.tracker.pause_timer().await
                }
                Some(window_id) => {
                    let tab = self.tabs.query_active(WindowQuery::Window(window_id)).await;
                    self.track_tab(tab).await
                }
            },
            BrowserEvent::IdleStateChanged {
                state: IdleState::Idle | IdleState::Locked,
            } => {
                self.commit().await?;
                self.tracker.pause_timer().await
            }
            BrowserEvent::IdleStateChanged {
                state: IdleState::Active,
            }
            | BrowserEvent::Startup { .. }
            | BrowserEvent::Installed { .. } => {
                let tab = self.tabs.query_active(WindowQuery::LastFocused).await;
                self.track_tab(tab).await
            }
            BrowserEvent::Alarm { name } if name == SAVE_ALARM => {
                self.commit().await?;
                self.tracker.restart_timer().await
            }
            BrowserEvent::Alarm { name } => {
                debug!("Ignoring alarm {name}");
                Ok(())
            }
        }
    }

    async fn commit(&self) -> Result<()> {
        let outcome = self.tracker.commit_time().await?;
        debug!("Commit finished with {:?}", outcome);
        Ok(())
    }

    /// Starts tracking the looked up tab. A failed lookup usually means the tab was closed in
    /// the meantime, tracking resumes with the next event.
    async fn track_tab(&self, lookup: Result<Option<Tab>>) -> Result<()> {
        match lookup {
            Ok(Some(Tab { url: Some(url), .. })) if !url.is_empty() => {
                self.tracker.start_tracking(&url).await
            }
            Ok(Some(tab)) => {
                debug!("Tab {} has no url yet, pausing", tab.id);
                self.tracker.pause_timer().await
            }
            Ok(None) => Ok(()),
            Err(e) => {
                debug!("Tab lookup failed {e:?}");
                Ok(())
            }
        }
    }
}

impl<S: KeyValueStore, T: TabProvider> EventProcessor for EventRouter<S, T> {
    async fn process_next(&mut self, event: BrowserEvent) -> Result<()> {
        self.dispatch(event).await
    }

    async fn finalize(&mut self) -> Result<()> {
        // Whatever is running now is lost, at most one alarm period of time.
        debug!("Router stopped in {:?}", self.tracker.state().await?);
        Ok(())
    }
}
