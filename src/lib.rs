//! Live log pipeline for RTT-style line streams: a worker thread filters and
//! highlights lines, and a tick-driven drain loop feeds a terminal view.

pub mod annotate;
pub mod app;
pub mod config;
pub mod controls;
pub mod drain;
pub mod error;
pub mod event;
pub mod history;
pub mod pipeline;
pub mod source;
pub mod tui;
pub mod view;
pub mod worker;

pub use annotate::annotate;
pub use drain::{DrainConfig, Drainer, Render, Ticker};
pub use error::{AppError, ConfigError, PipelineError};
pub use event::{AnnotatedLine, LogEvent, RenderBatch, Run};
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle};
pub use view::LogView;
pub use worker::{PipelineState, Worker, WorkerStats};
