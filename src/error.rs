use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("log pipeline is closed")]
    Closed,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker thread panicked")]
    WorkerPanicked,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--max-lines must be at least 1")]
    MaxLines,

    #[error("--tick-ms must be at least 1")]
    TickInterval,

    #[error("--max-batches must be at least 1")]
    MaxBatches,

    #[error("--idle-poll-ms must be at least 1")]
    IdlePoll,

    #[error("--demo-rate must be at least 1")]
    DemoRate,

    #[error("--demo cannot be combined with a command")]
    DemoWithCommand,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("stdout must be a TTY (run this in a terminal, not redirected)")]
    NotATerminal,

    #[error("stdin is a terminal; pipe log lines in, pass --demo, or give a command after --")]
    NoLineSource,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
