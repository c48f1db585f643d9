use anyhow::Result;
use chrono::Duration;
use tracing::{debug, info};

use crate::daemon::storage::kv::KeyValueStore;

use super::{domain::resolve_domain, session::TrackingState, Tracker};

/// Bounds a single commit must fall into to be recorded. The lower bound drops accidental tab
/// flicks, the upper bound drops sessions that were left open without any event, like a laptop
/// going to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitWindow {
    pub min: Duration,
    pub max: Duration,
}

impl CommitWindow {
    pub fn accepts(&self, duration: Duration) -> bool {
        self.min <= duration && duration <= self.max
    }
}

impl Default for CommitWindow {
    fn default() -> Self {
        Self {
            min: Duration::milliseconds(15_000),
            max: Duration::milliseconds(300_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    NoSession,
    Ineligible,
    TooShort(Duration),
    TooLong(Duration),
    /// Accepted and handed to the usage store. The store may still drop whitelisted domains.
    Recorded { domain: String, duration: Duration },
}

impl<S: KeyValueStore> Tracker<S> {
    /// Closes out the running session and records its time. The session itself is left as is,
    /// replacing or clearing it is up to the caller.
    pub async fn commit_time(&self) -> Result<CommitOutcome> {
        let TrackingState::Tracking(session) = self.sessions.load().await? else {
            return Ok(CommitOutcome::NoSession);
        };

        let duration = self.clock.time() - session.started_at;
        let Some(domain) = resolve_domain(&session.url) else {
            return Ok(CommitOutcome::Ineligible);
        };

        if !self.window.accepts(duration) {
            debug!("Dropping {duration} on {domain}, outside of {:?}", self.window);
            return Ok(if duration < self.window.min {
                CommitOutcome::TooShort(duration)
            } else {
                CommitOutcome::TooLong(duration)
            });
        }

        self.usage.record(&domain, duration, &session.favicon).await?;
        info!("Committed {duration} on {domain}");
        Ok(CommitOutcome::Recorded { domain, duration })
    }
}
