//! The processing worker: the only owner of pipeline state and history.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, trace};

use crate::annotate::annotate;
use crate::event::{AnnotatedLine, LogEvent, RenderBatch};
use crate::history::History;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    pub filter: String,
    pub highlight: String,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub events: u64,
    pub lines: u64,
    pub batches: u64,
    pub full_refreshes: u64,
}

#[derive(Debug)]
pub struct Worker {
    state: PipelineState,
    history: History,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(max_lines: usize) -> Self {
        Self {
            state: PipelineState::default(),
            history: History::new(max_lines),
            stats: WorkerStats::default(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Applies one event and returns the batch it produces, if any.
    pub fn handle(&mut self, event: LogEvent) -> Option<RenderBatch> {
        self.stats.events += 1;

        let batch = match event {
            LogEvent::NewLine { text } => self.on_line(text),
            LogEvent::FilterChanged { text } => {
                self.state.filter = text;
                Some(self.full_refresh())
            }
            LogEvent::HighlightChanged { text } => {
                self.state.highlight = text;
                Some(self.full_refresh())
            }
            LogEvent::PauseToggled { now_paused } => self.on_pause(now_paused),
            LogEvent::Cleared => {
                self.history.clear();
                Some(RenderBatch::replace(Vec::new()))
            }
        };

        if batch.is_some() {
            self.stats.batches += 1;
        }
        batch
    }

    fn on_line(&mut self, text: String) -> Option<RenderBatch> {
        self.stats.lines += 1;

        if self.state.paused {
            self.history.push(text);
            return None;
        }

        let annotated = annotate(&text, &self.state.filter, &self.state.highlight);
        let seq = self.history.push(text);
        trace!(seq, visible = annotated.is_some(), "line");
        annotated.map(|line| RenderBatch::append(vec![line]))
    }

    fn on_pause(&mut self, now_paused: bool) -> Option<RenderBatch> {
        let was_paused = self.state.paused;
        self.state.paused = now_paused;

        match (was_paused, now_paused) {
            (false, true) => {
                debug!(retained = self.history.len(), "paused");
                None
            }
            (true, false) => {
                debug!(retained = self.history.len(), "resumed");
                Some(self.full_refresh())
            }
            _ => None,
        }
    }

    /// Recomputes every visible line from the whole retained history,
    /// including lines that arrived while paused.
    fn full_refresh(&mut self) -> RenderBatch {
        self.stats.full_refreshes += 1;

        let filter = self.state.filter.as_str();
        let highlight = self.state.highlight.as_str();
        let lines: Vec<AnnotatedLine> = self
            .history
            .iter()
            .filter_map(|record| annotate(&record.text, filter, highlight))
            .collect();

        debug!(
            filter,
            highlight,
            retained = self.history.len(),
            visible = lines.len(),
            "full refresh"
        );
        RenderBatch::replace(lines)
    }

    /// Consumes events until the stop flag is raised or either channel
    /// disconnects.
    pub fn run(
        mut self,
        events: Receiver<LogEvent>,
        batches: Sender<RenderBatch>,
        stop: Arc<AtomicBool>,
        idle_poll: Duration,
    ) -> WorkerStats {
        info!(idle_poll_ms = idle_poll.as_millis() as u64, "worker started");

        loop {
            if stop.load(Ordering::Acquire) {
                debug!("stop requested");
                break;
            }

            match events.recv_timeout(idle_poll) {
                Ok(event) => {
                    if let Some(batch) = self.handle(event)
                        && batches.send(batch).is_err()
                    {
                        debug!("renderer side went away");
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("all producers went away");
                    break;
                }
            }
        }

        let stats = self.stats;
        info!(
            events = stats.events,
            lines = stats.lines,
            batches = stats.batches,
            full_refreshes = stats.full_refreshes,
            evicted = self.history.evicted(),
            "worker stopped"
        );
        stats
    }
}
