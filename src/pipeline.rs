//! Wiring between producers, the processing worker and the drain loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Sender, unbounded};
use tracing::{debug, warn};

use crate::drain::{DrainConfig, Drainer};
use crate::error::PipelineError;
use crate::event::LogEvent;
use crate::history::DEFAULT_MAX_LINES;
use crate::worker::{Worker, WorkerStats};

pub const DEFAULT_IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub max_lines: usize,
    pub idle_poll: Duration,
    pub drain: DrainConfig,
    pub filter: String,
    pub highlight: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            idle_poll: DEFAULT_IDLE_POLL,
            drain: DrainConfig::default(),
            filter: String::new(),
            highlight: String::new(),
        }
    }
}

/// Cheap, cloneable entry point for line sources and the control surface.
///
/// Every call is a non-blocking push onto the ingestion channel and may be
/// made from any thread.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    events: Sender<LogEvent>,
}

impl PipelineHandle {
    pub fn push_line(&self, text: impl Into<String>) -> Result<(), PipelineError> {
        self.send(LogEvent::NewLine { text: text.into() })
    }

    pub fn set_filter(&self, text: impl Into<String>) -> Result<(), PipelineError> {
        self.send(LogEvent::FilterChanged { text: text.into() })
    }

    pub fn set_highlight(&self, text: impl Into<String>) -> Result<(), PipelineError> {
        self.send(LogEvent::HighlightChanged { text: text.into() })
    }

    pub fn set_paused(&self, now_paused: bool) -> Result<(), PipelineError> {
        self.send(LogEvent::PauseToggled { now_paused })
    }

    pub fn clear(&self) -> Result<(), PipelineError> {
        self.send(LogEvent::Cleared)
    }

    pub fn send(&self, event: LogEvent) -> Result<(), PipelineError> {
        self.events.send(event).map_err(|_| PipelineError::Closed)
    }
}

/// A running pipeline session. Dropping it stops the worker.
#[derive(Debug)]
pub struct Pipeline {
    handle: PipelineHandle,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<WorkerStats>>,
}

impl Pipeline {
    /// Starts the worker thread and returns the session plus the drain side
    /// of the output channel.
    pub fn spawn(config: &PipelineConfig) -> Result<(Self, Drainer), PipelineError> {
        let (event_tx, event_rx) = unbounded();
        let (batch_tx, batch_rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = Worker::new(config.max_lines);
        let idle_poll = config.idle_poll;
        let worker_stop = Arc::clone(&stop);
        let join = thread::Builder::new()
            .name("rttview-worker".to_owned())
            .spawn(move || worker.run(event_rx, batch_tx, worker_stop, idle_poll))
            .map_err(PipelineError::Spawn)?;

        let pipeline = Self {
            handle: PipelineHandle { events: event_tx },
            stop,
            worker: Some(join),
        };

        if !config.filter.is_empty() {
            pipeline.handle.set_filter(config.filter.as_str())?;
        }
        if !config.highlight.is_empty() {
            pipeline.handle.set_highlight(config.highlight.as_str())?;
        }

        Ok((pipeline, Drainer::new(batch_rx, config.drain.max_batches)))
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Stops the worker, waits for it and drops undelivered batches.
    pub fn shutdown(mut self, drainer: &Drainer) -> Result<WorkerStats, PipelineError> {
        let stats = self.stop_and_join();
        let discarded = drainer.discard();
        debug!(discarded, "pipeline shut down");
        stats
    }

    fn stop_and_join(&mut self) -> Result<WorkerStats, PipelineError> {
        self.stop.store(true, Ordering::Release);
        match self.worker.take() {
            Some(join) => join.join().map_err(|_| PipelineError::WorkerPanicked),
            None => Ok(WorkerStats::default()),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.worker.is_some()
            && let Err(err) = self.stop_and_join()
        {
            warn!(error = %err, "worker did not stop cleanly");
        }
    }
}
