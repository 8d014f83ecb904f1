use std::collections::VecDeque;

use crate::drain::Render;
use crate::event::{AnnotatedLine, RenderBatch};

/// What the terminal currently shows, newest line last.
#[derive(Debug)]
pub struct LogView {
    lines: VecDeque<AnnotatedLine>,
    max_lines: usize,
    updates: u64,
}

impl LogView {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines: max_lines.max(1),
            updates: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// The last `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &AnnotatedLine> {
        self.lines.iter().skip(self.lines.len().saturating_sub(count))
    }
}

impl Render for LogView {
    fn render(&mut self, batch: RenderBatch) {
        if !batch.append {
            self.lines.clear();
        }

        for line in batch.lines {
            self.lines.push_back(line);
            if self.lines.len() > self.max_lines {
                let _ = self.lines.pop_front();
            }
        }

        self.updates = self.updates.saturating_add(1);
    }
}
