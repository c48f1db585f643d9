use std::sync::Arc;

use anyhow::Result;
use tokio::{io::AsyncBufRead, io::AsyncBufReadExt, sync::mpsc};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::daemon::events::BrowserEvent;

use super::tabs::TabMirror;

/// Reads browser events sent by the bridge, one JSON object per line, and forwards them to the
/// router. End of input means the browser went away and shuts the tracker down.
pub struct BridgeReader<R> {
    input: R,
    next: mpsc::Sender<BrowserEvent>,
    tabs: Arc<TabMirror>,
    shutdown: CancellationToken,
}

impl<R: AsyncBufRead + Unpin> BridgeReader<R> {
    pub fn new(
        input: R,
        next: mpsc::Sender<BrowserEvent>,
        tabs: Arc<TabMirror>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            input,
            next,
            tabs,
            shutdown,
        }
    }

    /// Executes the reading loop.
    pub async fn run(self) -> Result<()> {
        let mut lines = LinesStream::new(self.input.lines());
        loop {
            let line = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                line = lines.next() => line
            };

            let line = match line {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    error!("Failed to read from the bridge {e:?}");
                    self.shutdown.cancel();
                    return Err(e.into());
                }
                None => {
                    info!("Bridge closed its output, shutting down");
                    self.shutdown.cancel();
                    return Ok(());
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<BrowserEvent>(&line) {
                Ok(event) => {
                    debug!("Received {:?}", event);
                    self.tabs.observe(&event);
                    self.next
                        .send(event)
                        .await
                        .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
                }
                // Ignore illegal values, a single bad line shouldn't stop tracking.
                Err(e) => warn!("Bridge sent an illegal event {line}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::daemon::{
        collection::tabs::{TabMirror, TabProvider},
        events::{BrowserEvent, IdleState},
    };

    use super::BridgeReader;

    #[tokio::test]
    async fn test_reader_skips_illegal_lines() -> Result<()> {
        let input = "{\"type\":\"tab_activated\",\"tab_id\":1,\"window_id\":2}\n\
                     not json at all\n\
                     \n\
                     {\"type\":\"unknown_event\"}\n\
                     {\"type\":\"idle_state_changed\",\"state\":\"idle\"}\n";
        let (sender, mut receiver) = mpsc::channel(10);
        let tabs = Arc::new(TabMirror::new());
        let shutdown = CancellationToken::new();

        BridgeReader::new(input.as_bytes(), sender, tabs.clone(), shutdown.clone())
            .run()
            .await?;

        assert_eq!(
            receiver.recv().await,
            Some(BrowserEvent::TabActivated {
                tab_id: 1,
                window_id: 2,
                url: None,
            })
        );
        assert_eq!(
            receiver.recv().await,
            Some(BrowserEvent::IdleStateChanged {
                state: IdleState::Idle
            })
        );
        assert_eq!(receiver.recv().await, None);

        // Mirror sees events before the router does.
        assert!(tabs.get(1).await?.active);
        // End of input stops the rest of the tracker.
        assert!(shutdown.is_cancelled());
        Ok(())
    }

    #[tokio::test]
    async fn test_reader_stops_on_shutdown() -> Result<()> {
        let (_writer, reader) = tokio::io::duplex(64);
        let (sender, _receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        BridgeReader::new(
            tokio::io::BufReader::new(reader),
            sender,
            Arc::new(TabMirror::new()),
            shutdown,
        )
        .run()
        .await?;
        Ok(())
    }
}
