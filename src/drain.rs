//! Renderer-side drain loop: bounded, coalescing reads of the output channel.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::trace;

use crate::event::{AnnotatedLine, RenderBatch};

pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_BATCHES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainConfig {
    pub tick: Duration,
    pub max_batches: usize,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            max_batches: DEFAULT_MAX_BATCHES,
        }
    }
}

/// Anything that can show render batches.
///
/// On `append == true` the lines extend what is shown, in order. On
/// `append == false` everything shown is replaced by the lines.
pub trait Render {
    fn render(&mut self, batch: RenderBatch);
}

#[derive(Debug)]
pub struct Drainer {
    batches: Receiver<RenderBatch>,
    max_batches: usize,
}

impl Drainer {
    pub fn new(batches: Receiver<RenderBatch>, max_batches: usize) -> Self {
        Self {
            batches,
            max_batches: max_batches.max(1),
        }
    }

    /// Pops up to `max_batches` batches and merges them into one update.
    ///
    /// A replacing batch ends the drain and discards whatever was merged
    /// before it; batches queued behind it wait for the next call.
    pub fn drain(&self) -> Option<RenderBatch> {
        let mut lines: Vec<AnnotatedLine> = Vec::new();
        let mut append = true;
        let mut popped = 0usize;

        while popped < self.max_batches {
            let batch = match self.batches.try_recv() {
                Ok(batch) => batch,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            popped += 1;

            if batch.append {
                lines.extend(batch.lines);
            } else {
                lines = batch.lines;
                append = false;
                break;
            }
        }

        if popped == 0 {
            return None;
        }

        trace!(popped, lines = lines.len(), append, "drained");
        Some(RenderBatch { lines, append })
    }

    /// Drains once and hands the result to `renderer`. Returns whether
    /// anything was rendered.
    pub fn tick(&self, renderer: &mut impl Render) -> bool {
        match self.drain() {
            Some(batch) => {
                renderer.render(batch);
                true
            }
            None => false,
        }
    }

    /// Throws away every queued batch.
    pub fn discard(&self) -> usize {
        self.batches.try_iter().count()
    }

    pub fn pending(&self) -> usize {
        self.batches.len()
    }
}

/// Fixed-period timer driven by the caller's loop.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next: now + interval,
        }
    }

    /// True once per elapsed interval. Missed ticks are not replayed.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }

        self.next = now + self.interval;
        true
    }

    /// Time left until the next tick.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}
