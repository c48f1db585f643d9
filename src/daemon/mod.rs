use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use collection::{alarm::AlarmScheduler, reader::BridgeReader, tabs::TabMirror};
use events::BrowserEvent;
use processing::{router::EventRouter, ProcessingModule};
use storage::{
    kv::{JsonFileStore, KeyValueStore},
    usage::UsageStore,
};
use tokio::{
    io::{AsyncBufRead, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracker::{commit::CommitWindow, session::SessionStore, Tracker};

use crate::utils::clock::{Clock, DefaultClock};

pub mod collection;
pub mod events;
pub mod processing;
pub mod shutdown;
pub mod storage;
pub mod tracker;

/// Period of the save alarm. Must stay well under the commit limit, otherwise long sessions are
/// dropped instead of recorded in chunks.
pub const SAVE_ALARM_PERIOD: Duration = Duration::from_secs(60);

pub const STORE_FILE: &str = "storage.json";

const EVENT_BUFFER: usize = 16;

/// Represents the starting point for the tracker. Browser events are read from stdin until the
/// bridge closes it.
pub async fn start_daemon(dir: PathBuf) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(dir.join(STORE_FILE))?);
    info!("Tracking into {:?}", store.path());
    run_tracker(store, BufReader::new(tokio::io::stdin()), Arc::new(DefaultClock)).await
}

async fn run_tracker<S, R>(store: S, input: R, clock: Arc<dyn Clock>) -> Result<()>
where
    S: KeyValueStore + Clone,
    R: AsyncBufRead + Unpin,
{
    let (sender, receiver) = mpsc::channel::<BrowserEvent>(EVENT_BUFFER);
    let shutdown_token = CancellationToken::new();
    let tabs = Arc::new(TabMirror::new());

    let reader = BridgeReader::new(input, sender.clone(), tabs.clone(), shutdown_token.clone());
    let alarm = AlarmScheduler::new(
        sender,
        shutdown_token.clone(),
        SAVE_ALARM_PERIOD,
        clock.clone(),
    );
    let processor = create_processor(store, tabs, receiver, clock);

    let (_, reading_result, alarm_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = reader.run().await;
            shutdown_token.cancel();
            result
        },
        alarm.run(),
        processor.run(),
    );

    if let Err(reading_result) = reading_result {
        error!("Bridge reader got an error {:?}", reading_result);
    }

    if let Err(alarm_result) = alarm_result {
        error!("Save alarm got an error {:?}", alarm_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

fn create_processor<S: KeyValueStore + Clone>(
    store: S,
    tabs: Arc<TabMirror>,
    receiver: mpsc::Receiver<BrowserEvent>,
    clock: Arc<dyn Clock>,
) -> ProcessingModule<EventRouter<S, Arc<TabMirror>>> {
    let tracker = Tracker::new(
        SessionStore::new(store.clone()),
        UsageStore::new(store, clock.clone()),
        clock,
        CommitWindow::default(),
    );
    ProcessingModule::new(receiver, EventRouter::new(tracker, tabs))
}
