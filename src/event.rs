/// Everything that flows into the processing worker.
///
/// Line sources only ever send `NewLine`; the control surface sends the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    NewLine { text: String },
    FilterChanged { text: String },
    HighlightChanged { text: String },
    PauseToggled { now_paused: bool },
    Cleared,
}

/// A piece of a line that is either highlighted or plain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub highlighted: bool,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: false,
        }
    }

    pub fn highlighted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            highlighted: true,
        }
    }
}

/// One visible line, split into runs in left-to-right order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedLine {
    pub runs: Vec<Run>,
}

impl AnnotatedLine {
    /// The original line text, reassembled from its runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn has_highlight(&self) -> bool {
        self.runs.iter().any(|run| run.highlighted)
    }
}

/// A unit of renderer-facing output.
///
/// `append == true` extends what is on screen, `append == false` replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBatch {
    pub lines: Vec<AnnotatedLine>,
    pub append: bool,
}

impl RenderBatch {
    pub fn append(lines: Vec<AnnotatedLine>) -> Self {
        Self {
            lines,
            append: true,
        }
    }

    pub fn replace(lines: Vec<AnnotatedLine>) -> Self {
        Self {
            lines,
            append: false,
        }
    }

    /// All runs of all lines, flattened in display order.
    pub fn segments(&self) -> impl Iterator<Item = &Run> {
        self.lines.iter().flat_map(|line| line.runs.iter())
    }

    pub fn line_texts(&self) -> Vec<String> {
        self.lines.iter().map(AnnotatedLine::text).collect()
    }
}
