use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::daemon::storage::kv::{Items, KeyValueStore};

pub const CURRENT_URL_KEY: &str = "_current_url";
pub const START_TIME_KEY: &str = "_start_time";
pub const FAVICON_KEY: &str = "_favicon";

const SESSION_KEYS: [&str; 3] = [CURRENT_URL_KEY, START_TIME_KEY, FAVICON_KEY];

/// The in-flight tracking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub favicon: String,
}

/// Explicit view of the persisted session keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingState {
    /// Nothing on record.
    Idle,
    /// The last url is remembered but no time is accruing, e.g. after the window lost focus.
    Suspended { url: String, favicon: String },
    Tracking(Session),
}

impl TrackingState {
    pub fn url(&self) -> Option<&str> {
        match self {
            TrackingState::Idle => None,
            TrackingState::Suspended { url, .. } => Some(url),
            TrackingState::Tracking(session) => Some(&session.url),
        }
    }
}

/// One slot for the session with overwrite semantics. Every operation is a single store call.
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<TrackingState> {
        let items = self.store.get(&SESSION_KEYS).await?;

        let url = items
            .get(CURRENT_URL_KEY)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        let started_at = items
            .get(START_TIME_KEY)
            .and_then(Value::as_i64)
            .filter(|ms| *ms > 0)
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        let favicon = items
            .get(FAVICON_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(match (url, started_at) {
            (Some(url), Some(started_at)) => TrackingState::Tracking(Session {
                url,
                started_at,
                favicon,
            }),
            (Some(url), None) => TrackingState::Suspended { url, favicon },
            (None, _) => TrackingState::Idle,
        })
    }

    /// Replaces whatever was on record with `session`.
    pub async fn begin(&self, session: Session) -> Result<()> {
        let mut items = Items::new();
        items.insert(CURRENT_URL_KEY.into(), session.url.into());
        items.insert(
            START_TIME_KEY.into(),
            session.started_at.timestamp_millis().into(),
        );
        items.insert(FAVICON_KEY.into(), session.favicon.into());
        self.store.set(items).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.remove(&SESSION_KEYS).await
    }

    /// Stops time from accruing but keeps the url and favicon.
    pub async fn clear_start_time(&self) -> Result<()> {
        self.store.remove(&[START_TIME_KEY]).await
    }

    pub async fn set_start_time(&self, started_at: DateTime<Utc>) -> Result<()> {
        let mut items = Items::new();
        items.insert(START_TIME_KEY.into(), started_at.timestamp_millis().into());
        self.store.set(items).await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::daemon::storage::kv::{KeyValueStore, MemoryStore};

    use super::{Session, SessionStore, TrackingState};

    #[tokio::test]
    async fn test_session_lifecycle() -> Result<()> {
        let sessions = SessionStore::new(MemoryStore::new());
        assert_eq!(sessions.load().await?, TrackingState::Idle);

        let session = Session {
            url: "https://a.com/".into(),
            started_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            favicon: "icon".into(),
        };
        sessions.begin(session.clone()).await?;
        assert_eq!(sessions.load().await?, TrackingState::Tracking(session));

        sessions.clear_start_time().await?;
        assert_eq!(
            sessions.load().await?,
            TrackingState::Suspended {
                url: "https://a.com/".into(),
                favicon: "icon".into()
            }
        );

        sessions.clear().await?;
        assert_eq!(sessions.load().await?, TrackingState::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_start_time_without_url_is_idle() -> Result<()> {
        let store = MemoryStore::new();
        store
            .set(json!({"_start_time": 1_700_000_000_000i64}).as_object().cloned().unwrap())
            .await?;
        let sessions = SessionStore::new(&store);
        assert_eq!(sessions.load().await?, TrackingState::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_favicon_reads_as_empty() -> Result<()> {
        let store = MemoryStore::new();
        store
            .set(
                json!({"_current_url": "https://a.com/", "_start_time": 1_700_000_000_000i64})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await?;
        let sessions = SessionStore::new(&store);
        let TrackingState::Tracking(session) = sessions.load().await? else {
            panic!("Expected a running session");
        };
        assert_eq!(session.favicon, "");
        Ok(())
    }
}
