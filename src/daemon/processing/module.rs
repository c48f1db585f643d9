use anyhow::Result;

use crate::daemon::events::BrowserEvent;

/// Represents an event processor. The router is the one that matters, but the run loop doesn't
/// need to know that.
pub trait EventProcessor {
    fn process_next(
        &mut self,
        event: BrowserEvent,
    ) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
