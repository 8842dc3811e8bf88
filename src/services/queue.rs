use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};

/// Fire-and-forget queue for out-of-band work.
pub trait WorkQueue: Send + Sync {
    fn enqueue(&self, payload: String) -> Result<(), AppError>;
}

pub struct ChannelWorkQueue {
    tx: Sender<String>,
}

impl ChannelWorkQueue {
    pub fn new() -> (Self, Receiver<String>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl WorkQueue for ChannelWorkQueue {
    fn enqueue(&self, payload: String) -> Result<(), AppError> {
        log::trace!("Enqueueing work item: {}", payload);
        self.tx.send(payload)?;
        Ok(())
    }
}

/// Drains the queue until every sender is dropped. Returns the number of
/// items processed.
pub fn start_worker(rx: Receiver<String>) -> usize {
    log::info!("Starting work queue worker");
    let mut processed = 0;
    for payload in rx {
        log::info!("Processing queued search requirement: {}", payload);
        processed += 1;
    }
    log::info!("Work queue closed after {} items.", processed);
    processed
}
