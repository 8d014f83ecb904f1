use std::collections::VecDeque;

pub const DEFAULT_MAX_LINES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub seq: u64,
    pub text: String,
}

/// Raw lines retained by the worker, oldest first, capped at `max_lines`.
#[derive(Debug)]
pub struct History {
    lines: VecDeque<LineRecord>,
    max_lines: usize,
    next_seq: u64,
    evicted: u64,
}

impl History {
    pub fn new(max_lines: usize) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            lines: VecDeque::with_capacity(max_lines.min(4096)),
            max_lines,
            next_seq: 0,
            evicted: 0,
        }
    }

    /// Stores `text` and returns its sequence number.
    pub fn push(&mut self, text: String) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.lines.push_back(LineRecord { seq, text });

        if self.lines.len() > self.max_lines {
            let _ = self.lines.pop_front();
            self.evicted = self.evicted.saturating_add(1);
        }

        seq
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineRecord> {
        self.lines.iter()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

#[cfg(test)]
mod tests {
    use super::History;

    fn texts<'a>(lines: impl Iterator<Item = &'a super::LineRecord>) -> Vec<&'a str> {
        lines.map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn oldest_lines_are_dropped_past_the_cap() {
        let mut history = History::new(3);
        for text in ["a", "b", "c", "d", "e"] {
            history.push(text.to_owned());
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.evicted(), 2);
        assert_eq!(texts(history.iter()), vec!["c", "d", "e"]);
        assert_eq!(history.iter().next().map(|line| line.seq), Some(2));
    }

    #[test]
    fn clear_keeps_sequence_running() {
        let mut history = History::new(10);
        history.push("a".to_owned());
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.push("b".to_owned()), 1);
    }

    #[test]
    fn zero_cap_is_raised_to_one() {
        let mut history = History::new(0);
        history.push("a".to_owned());
        history.push("b".to_owned());
        assert_eq!(texts(history.iter()), vec!["b"]);
    }
}
