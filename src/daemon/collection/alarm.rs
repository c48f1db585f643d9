use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{daemon::events::BrowserEvent, utils::clock::Clock};

/// Fires the save alarm on a fixed period so long sessions get committed in chunks that fit
/// under the commit limit.
pub struct AlarmScheduler {
    next: mpsc::Sender<BrowserEvent>,
    shutdown: CancellationToken,
    period: Duration,
    clock: Arc<dyn Clock>,
}

impl AlarmScheduler {
    pub fn new(
        next: mpsc::Sender<BrowserEvent>,
        shutdown: CancellationToken,
        period: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            next,
            shutdown,
            period,
            clock,
        }
    }

    /// Executes the alarm loop.
    pub async fn run(self) -> Result<()> {
        let mut alarm_point = self.clock.instant();
        loop {
            alarm_point += self.period;

            tokio::select! {
                // Cancelation drops the sender, which lets the router finish once the reader is
                // done as well.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(alarm_point) => ()
            }

            debug!("Save alarm fired");
            self.next
                .send(BrowserEvent::save_alarm())
                .await
                .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{daemon::events::BrowserEvent, utils::clock::TestClock};

    use super::AlarmScheduler;

    #[tokio::test(start_paused = true)]
    async fn test_alarm_fires_every_period() -> Result<()> {
        let (sender, mut receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        let clock = TestClock::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let scheduler = AlarmScheduler::new(
            sender,
            shutdown.clone(),
            Duration::from_secs(60),
            Arc::new(clock.clone()),
        );

        let (result, received) = tokio::join!(scheduler.run(), async {
            let mut received = vec![];
            for _ in 0..3 {
                received.push((receiver.recv().await, clock.reference.elapsed()));
            }
            shutdown.cancel();
            received
        });
        result?;

        assert_eq!(
            received,
            vec![
                (Some(BrowserEvent::save_alarm()), Duration::from_secs(60)),
                (Some(BrowserEvent::save_alarm()), Duration::from_secs(120)),
                (Some(BrowserEvent::save_alarm()), Duration::from_secs(180)),
            ]
        );
        Ok(())
    }
}
