//! Start/stop timer over the persisted session. There is at most one session; every browser
//! event first commits it and then either replaces it or pauses it.

pub mod commit;
pub mod domain;
pub mod session;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::{
    daemon::storage::{kv::KeyValueStore, usage::UsageStore},
    utils::clock::Clock,
};

use commit::CommitWindow;
use domain::{favicon_url, resolve_domain};
use session::{Session, SessionStore, TrackingState};

pub struct Tracker<S> {
    sessions: SessionStore<S>,
    usage: UsageStore<S>,
    clock: Arc<dyn Clock>,
    window: CommitWindow,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn new(
        sessions: SessionStore<S>,
        usage: UsageStore<S>,
        clock: Arc<dyn Clock>,
        window: CommitWindow,
    ) -> Self {
        Self {
            sessions,
            usage,
            clock,
            window,
        }
    }

    pub async fn state(&self) -> Result<TrackingState> {
        self.sessions.load().await
    }

    /// Opens a fresh session for `url`, overwriting any previous one. Pages that can't be
    /// tracked stop tracking instead.
    pub async fn start_tracking(&self, url: &str) -> Result<()> {
        if resolve_domain(url).is_none() {
            debug!("{url} is not trackable");
            return self.stop_tracking().await;
        }
        self.sessions
            .begin(Session {
                url: url.to_string(),
                started_at: self.clock.time(),
                favicon: favicon_url(url),
            })
            .await
    }

    pub async fn stop_tracking(&self) -> Result<()> {
        self.sessions.clear().await
    }

    /// Stops time from accruing while keeping the last url on record.
    pub async fn pause_timer(&self) -> Result<()> {
        self.sessions.clear_start_time().await
    }

    /// Starts counting again from now if there is a url on record.
    pub async fn restart_timer(&self) -> Result<()> {
        if self.sessions.load().await?.url().is_some() {
            self.sessions.set_start_time(self.clock.time()).await?;
        }
        Ok(())
    }
}
