use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, info_span, Instrument};

use super::events::BrowserEvent;

pub mod module;
pub mod router;

/// Drains the event channel into the processor strictly one event at a time, so two handlers
/// never interleave their storage calls. A failing event is logged and skipped.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<BrowserEvent>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<BrowserEvent>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut handled = 0usize;
        let mut failed = 0usize;

        while let Some(event) = self.receiver.recv().await {
            handled += 1;
            let span = info_span!("Routing event", seq = handled);
            let result = async {
                debug!(?event, "Routing");
                self.processor.process_next(event.clone()).await
            }
            .instrument(span)
            .await;
            if let Err(e) = result {
                failed += 1;
                error!(?event, "Event handler failed: {e:?}");
            }
        }

        self.receiver.close();
        info!(handled, failed, "Event channel closed");
        self.processor.finalize().await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use tokio::sync::mpsc;

    use crate::{daemon::events::BrowserEvent, utils::logging::TEST_LOGGING};

    use super::{module::EventProcessor, ProcessingModule};

    #[derive(Default)]
    struct Recording {
        seen: Vec<BrowserEvent>,
        finalized: bool,
    }

    impl EventProcessor for &mut Recording {
        async fn process_next(&mut self, event: BrowserEvent) -> Result<()> {
            let fail = matches!(event, BrowserEvent::TabRemoved { .. });
            self.seen.push(event);
            if fail {
                bail!("storage unavailable");
            }
            Ok(())
        }

        async fn finalize(&mut self) -> Result<()> {
            self.finalized = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_event_does_not_stop_processing() -> Result<()> {
        *TEST_LOGGING;
        let (sender, receiver) = mpsc::channel(4);
        sender.send(BrowserEvent::TabRemoved { tab_id: 1 }).await?;
        sender.send(BrowserEvent::save_alarm()).await?;
        drop(sender);

        let mut recording = Recording::default();
        ProcessingModule::new(receiver, &mut recording).run().await?;

        assert_eq!(
            recording.seen,
            vec![BrowserEvent::TabRemoved { tab_id: 1 }, BrowserEvent::save_alarm()]
        );
        assert!(recording.finalized);
        Ok(())
    }
}
