//! The interactive session: pipeline, line source, keyboard and screen.

use std::io::{self, IsTerminal};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use crossterm::terminal;
use tracing::{info, warn};

use crate::config::Options;
use crate::controls::{Action, Controls};
use crate::drain::Ticker;
use crate::error::AppError;
use crate::pipeline::{Pipeline, PipelineHandle};
use crate::source::{self, LineSource, SourceMessage};
use crate::tui::{self, StatusLine, TerminalGuard, UiMessage};
use crate::view::LogView;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceStatus {
    Streaming,
    Ended,
    Failed(String),
}

impl SourceStatus {
    fn label(&self) -> String {
        match self {
            SourceStatus::Streaming => "streaming".to_owned(),
            SourceStatus::Ended => "source ended".to_owned(),
            SourceStatus::Failed(err) => format!("source error: {}", err),
        }
    }
}

fn apply_action(
    action: Action,
    pipeline: &PipelineHandle,
) -> Result<ActionOutcome, AppError> {
    match action {
        Action::Nothing => return Ok(ActionOutcome::Idle),
        Action::Redraw => {}
        Action::Quit => return Ok(ActionOutcome::Quit),
        Action::SetPaused(now_paused) => pipeline.set_paused(now_paused)?,
        Action::SetFilter(text) => pipeline.set_filter(text)?,
        Action::SetHighlight(text) => pipeline.set_highlight(text)?,
        Action::Clear => pipeline.clear()?,
    }

    Ok(ActionOutcome::Redraw)
}

#[derive(Debug, PartialEq, Eq)]
enum ActionOutcome {
    Idle,
    Redraw,
    Quit,
}

pub fn run(options: Options) -> Result<(), AppError> {
    if !io::stdout().is_terminal() {
        return Err(AppError::NotATerminal);
    }
    if options.source == LineSource::Stdin && io::stdin().is_terminal() {
        return Err(AppError::NoLineSource);
    }

    info!(
        source = %options.source.label(),
        max_lines = options.pipeline.max_lines,
        tick_ms = options.pipeline.drain.tick.as_millis() as u64,
        max_batches = options.pipeline.drain.max_batches,
        "session starting"
    );

    let (pipeline, drainer) = Pipeline::spawn(&options.pipeline)?;
    let handle = pipeline.handle();

    let (notice_tx, notice_rx) = unbounded();
    let source_guard = source::spawn_source(&options.source, handle.clone(), notice_tx)?;
    let (ui_tx, ui_rx) = unbounded();
    tui::spawn_ui_reader(ui_tx)?;

    let mut controls = Controls::new(
        options.pipeline.filter.clone(),
        options.pipeline.highlight.clone(),
    );
    let mut view = LogView::new(options.pipeline.max_lines);
    let mut status = SourceStatus::Streaming;
    let source_label = options.source.label();

    let mut stdout = io::stdout();
    {
        let _guard = TerminalGuard::enter(&mut stdout)?;

        let mut dirty = true;
        let mut last_size = terminal::size().unwrap_or((0, 0));
        let mut ticker = Ticker::new(options.pipeline.drain.tick, Instant::now());

        'app: loop {
            while let Ok(notice) = notice_rx.try_recv() {
                status = match notice {
                    SourceMessage::Closed => SourceStatus::Ended,
                    SourceMessage::Error(err) => SourceStatus::Failed(err),
                };
                info!(status = %status.label(), "line source changed state");
                dirty = true;
            }

            while let Ok(message) = ui_rx.try_recv() {
                match message {
                    UiMessage::Key(key) => match apply_action(controls.on_key(key), &handle)? {
                        ActionOutcome::Idle => {}
                        ActionOutcome::Redraw => dirty = true,
                        ActionOutcome::Quit => break 'app,
                    },
                    UiMessage::Quit => break 'app,
                    UiMessage::Error(err) => return Err(io::Error::other(err).into()),
                }
            }

            let now = Instant::now();
            if ticker.due(now) && drainer.tick(&mut view) {
                dirty = true;
            }

            if let Ok(current_size) = terminal::size()
                && current_size != last_size
            {
                last_size = current_size;
                dirty = true;
            }

            if dirty {
                let status_label = status.label();
                tui::draw(
                    &mut stdout,
                    &view,
                    &controls,
                    StatusLine {
                        source: &source_label,
                        status: &status_label,
                    },
                )?;
                dirty = false;
            }

            thread::sleep(POLL_INTERVAL.min(ticker.remaining(Instant::now())));
        }
    }

    drop(source_guard);
    match pipeline.shutdown(&drainer) {
        Ok(stats) => info!(
            lines = stats.lines,
            batches = stats.batches,
            rendered_updates = view.updates(),
            "session ended"
        ),
        Err(err) => warn!(error = %err, "pipeline shutdown failed"),
    }

    if options.source == LineSource::Stdin {
        source::terminate_pipeline_group_if_safe();
    }
    Ok(())
}
