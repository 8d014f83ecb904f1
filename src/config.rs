use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::drain::DrainConfig;
use crate::error::ConfigError;
use crate::pipeline::PipelineConfig;
use crate::source::{DEFAULT_DEMO_RATE, LineSource};

#[derive(Parser, Debug)]
#[command(name = "rttview", version)]
#[command(about = "Follow a live RTT log stream with a live filter and highlight")]
#[command(after_help = "Examples:\n  JLinkRTTClient | rttview\n  rttview -- JLinkRTTClient -RTTTelnetPort 19021\n  rttview --demo --highlight error")]
pub struct Args {
    /// Generate demo log lines instead of reading a stream
    #[arg(long)]
    pub demo: bool,

    /// Demo lines per second
    #[arg(long, value_name = "N", default_value_t = DEFAULT_DEMO_RATE)]
    pub demo_rate: u32,

    /// Lines kept in history and on screen
    #[arg(long, value_name = "N", default_value_t = crate::history::DEFAULT_MAX_LINES)]
    pub max_lines: usize,

    /// Screen refresh tick in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub tick_ms: u64,

    /// Render batches merged per tick
    #[arg(long, value_name = "N", default_value_t = crate::drain::DEFAULT_MAX_BATCHES)]
    pub max_batches: usize,

    /// Worker queue poll timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub idle_poll_ms: u64,

    /// Initial filter text (case-insensitive substring)
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub filter: String,

    /// Initial highlight text (case-insensitive substring)
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub highlight: String,

    /// Write diagnostics to this file (level from RTTVIEW_LOG, default info)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Command whose stdout is the log stream
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Validated settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub source: LineSource,
    pub pipeline: PipelineConfig,
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn into_options(self) -> Result<Options, ConfigError> {
        if self.max_lines == 0 {
            return Err(ConfigError::MaxLines);
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::TickInterval);
        }
        if self.max_batches == 0 {
            return Err(ConfigError::MaxBatches);
        }
        if self.idle_poll_ms == 0 {
            return Err(ConfigError::IdlePoll);
        }

        let source = match (self.demo, self.command.is_empty()) {
            (true, false) => return Err(ConfigError::DemoWithCommand),
            (true, true) => {
                if self.demo_rate == 0 {
                    return Err(ConfigError::DemoRate);
                }
                LineSource::Demo {
                    lines_per_second: self.demo_rate,
                }
            }
            (false, false) => LineSource::Command(self.command),
            (false, true) => LineSource::Stdin,
        };

        Ok(Options {
            source,
            pipeline: PipelineConfig {
                max_lines: self.max_lines,
                idle_poll: Duration::from_millis(self.idle_poll_ms),
                drain: DrainConfig {
                    tick: Duration::from_millis(self.tick_ms),
                    max_batches: self.max_batches,
                },
                filter: self.filter,
                highlight: self.highlight,
            },
            log_file: self.log_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;

    use super::Args;
    use crate::error::ConfigError;
    use crate::source::LineSource;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rttview").chain(argv.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn defaults_read_stdin() {
        let options = parse(&[]).into_options().expect("valid");
        assert_eq!(options.source, LineSource::Stdin);
        assert_eq!(options.pipeline.max_lines, 10_000);
        assert_eq!(options.pipeline.idle_poll, Duration::from_millis(100));
        assert_eq!(options.pipeline.drain.tick, Duration::from_millis(100));
        assert_eq!(options.pipeline.drain.max_batches, 20);
        assert!(options.log_file.is_none());
    }

    #[test]
    fn trailing_arguments_become_the_command() {
        let options = parse(&["--filter", "err", "--", "JLinkRTTClient", "-RTTTelnetPort", "19021"])
            .into_options()
            .expect("valid");
        assert_eq!(
            options.source,
            LineSource::Command(vec![
                "JLinkRTTClient".to_owned(),
                "-RTTTelnetPort".to_owned(),
                "19021".to_owned()
            ])
        );
        assert_eq!(options.pipeline.filter, "err");
    }

    #[test]
    fn demo_mode_uses_rate() {
        let options = parse(&["--demo", "--demo-rate", "5"]).into_options().expect("valid");
        assert_eq!(options.source, LineSource::Demo { lines_per_second: 5 });
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(matches!(
            parse(&["--max-lines", "0"]).into_options(),
            Err(ConfigError::MaxLines)
        ));
        assert!(matches!(
            parse(&["--tick-ms", "0"]).into_options(),
            Err(ConfigError::TickInterval)
        ));
        assert!(matches!(
            parse(&["--max-batches", "0"]).into_options(),
            Err(ConfigError::MaxBatches)
        ));
        assert!(matches!(
            parse(&["--idle-poll-ms", "0"]).into_options(),
            Err(ConfigError::IdlePoll)
        ));
        assert!(matches!(
            parse(&["--demo", "--demo-rate", "0"]).into_options(),
            Err(ConfigError::DemoRate)
        ));
        assert!(matches!(
            parse(&["--demo", "--", "cat"]).into_options(),
            Err(ConfigError::DemoWithCommand)
        ));
    }
}
