//! Line sources feeding the pipeline: stdin, a spawned command, or demo lines.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::pipeline::PipelineHandle;

pub const DEFAULT_DEMO_RATE: u32 = 20;

/// Where log lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSource {
    Stdin,
    Command(Vec<String>),
    Demo { lines_per_second: u32 },
}

impl LineSource {
    pub fn label(&self) -> String {
        match self {
            LineSource::Stdin => "stdin".to_owned(),
            LineSource::Command(argv) => argv.join(" "),
            LineSource::Demo { .. } => "demo".to_owned(),
        }
    }
}

/// Lifecycle notices from a source thread to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMessage {
    Closed,
    Error(String),
}

/// Keeps a running source alive; dropping it stops what can be stopped.
///
/// The demo thread watches `stop`, a spawned command is killed and reaped.
/// A blocked stdin read cannot be interrupted, so that thread simply exits
/// on its next push once the pipeline is gone.
#[derive(Debug, Default)]
pub struct SourceGuard {
    stop: Option<Arc<AtomicBool>>,
    child: Option<Child>,
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        if let Some(stop) = &self.stop {
            stop.store(true, Ordering::Release);
        }
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                debug!(error = %err, "child already gone");
            }
            let _ = child.wait();
        }
    }
}

pub fn spawn_source(
    source: &LineSource,
    pipeline: PipelineHandle,
    notices: Sender<SourceMessage>,
) -> io::Result<SourceGuard> {
    info!(source = %source.label(), "starting line source");
    match source {
        LineSource::Stdin => {
            spawn_line_reader("rttview-stdin", io::stdin(), pipeline, notices)?;
            Ok(SourceGuard::default())
        }
        LineSource::Command(argv) => spawn_command(argv, pipeline, notices),
        LineSource::Demo { lines_per_second } => {
            spawn_demo(*lines_per_second, pipeline, notices)
        }
    }
}

fn spawn_line_reader<R>(
    name: &str,
    reader: R,
    pipeline: PipelineHandle,
    notices: Sender<SourceMessage>,
) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    thread::Builder::new().name(name.to_owned()).spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    debug!("line source reached end of input");
                    let _ = notices.send(SourceMessage::Closed);
                    break;
                }
                Ok(_) => {
                    let line = normalize_line(&buf);
                    if pipeline.push_line(line).is_err() {
                        debug!("pipeline closed, line reader exiting");
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(error = %err, "line source read failed");
                    let _ = notices.send(SourceMessage::Error(err.to_string()));
                    break;
                }
            }
        }
    })?;

    Ok(())
}

fn spawn_command(
    argv: &[String],
    pipeline: PipelineHandle,
    notices: Sender<SourceMessage>,
) -> io::Result<SourceGuard> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    info!(program = %program, pid = child.id(), "command started");

    let guard = SourceGuard {
        stop: None,
        child: Some(child),
    };
    attach_stdout_reader(guard, pipeline, notices)
}

/// Starts reading the guarded child's stdout. On error the guard is dropped,
/// which kills and reaps the child.
fn attach_stdout_reader(
    mut guard: SourceGuard,
    pipeline: PipelineHandle,
    notices: Sender<SourceMessage>,
) -> io::Result<SourceGuard> {
    let stdout = guard
        .child
        .as_mut()
        .and_then(|child| child.stdout.take())
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    spawn_line_reader("rttview-command", stdout, pipeline, notices)?;

    Ok(guard)
}

fn spawn_demo(
    lines_per_second: u32,
    pipeline: PipelineHandle,
    notices: Sender<SourceMessage>,
) -> io::Result<SourceGuard> {
    let stop = Arc::new(AtomicBool::new(false));
    let guard = SourceGuard {
        stop: Some(Arc::clone(&stop)),
        child: None,
    };
    let period = Duration::from_secs(1) / lines_per_second.max(1);

    thread::Builder::new()
        .name("rttview-demo".to_owned())
        .spawn(move || {
            let mut index = 0u64;
            while !stop.load(Ordering::Acquire) {
                if pipeline.push_line(demo_line(index)).is_err() {
                    break;
                }
                index = index.wrapping_add(1);
                thread::sleep(period);
            }
            let _ = notices.send(SourceMessage::Closed);
        })?;

    Ok(guard)
}

const DEMO_MESSAGES: [&str; 10] = [
    "<info> app: Boot complete, firmware v1.4.2",
    "<debug> sensor: temp=23.{n}C humidity=41%",
    "<info> ble: Advertising started",
    "<debug> adc: ch0={n} ch1={n}",
    "<warning> power: VBAT low ({n} mV)",
    "<info> ble: Connected, conn_handle=0x{n}",
    "<debug> sched: tick {n}",
    "<error> i2c: NACK from device 0x48",
    "<info> storage: Flash write ok, {n} bytes",
    "<debug> heartbeat",
];

/// Deterministic sample line in the style of a Cortex-M RTT log.
pub fn demo_line(index: u64) -> String {
    let template = DEMO_MESSAGES[(index % DEMO_MESSAGES.len() as u64) as usize];
    let millis = index * 50;
    let body = template.replace("{n}", &((index * 37) % 1000).to_string());
    format!("[{:05}.{:03}] {}", millis / 1000, millis % 1000, body)
}

/// Decodes one raw line: drops the line terminator and ANSI escapes.
pub fn normalize_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
    }

    strip_ansi(&String::from_utf8_lossy(&raw[..end]))
}

fn is_ansi_final_byte(ch: char) -> bool {
    ('@'..='~').contains(&ch)
}

pub fn strip_ansi(text: &str) -> String {
    if !text.contains('\u{1b}') {
        return text.to_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for seq_char in chars.by_ref() {
                    if is_ansi_final_byte(seq_char) {
                        break;
                    }
                }
            }
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(unix)]
pub fn terminate_pipeline_group_if_safe() {
    // In interactive shells with job control, pipeline commands are in a separate
    // process group from the shell. Signaling that group lets `q` stop upstream
    // producers like `tail -f` immediately.
    unsafe {
        let my_pgid = libc::getpgrp();
        if my_pgid <= 0 {
            return;
        }

        let parent_pgid = libc::getpgid(libc::getppid());
        if parent_pgid == my_pgid {
            return;
        }

        let _ = libc::signal(libc::SIGINT, libc::SIG_IGN);
        let _ = libc::killpg(my_pgid, libc::SIGINT);
    }
}

#[cfg(not(unix))]
pub fn terminate_pipeline_group_if_safe() {}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crossbeam_channel::unbounded;

    use super::{
        LineSource, SourceGuard, SourceMessage, demo_line, normalize_line, spawn_line_reader,
        spawn_source, strip_ansi,
    };
    use crate::pipeline::{Pipeline, PipelineConfig};

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        let text = "\u{1b}[2m2026-02-06\u{1b}[0m \u{1b}[31mERROR\u{1b}[0m line";
        assert_eq!(strip_ansi(text), "2026-02-06 ERROR line");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn normalize_drops_line_endings_once() {
        assert_eq!(normalize_line(b"abc\r\n"), "abc");
        assert_eq!(normalize_line(b"abc\n"), "abc");
        assert_eq!(normalize_line(b"abc"), "abc");
        assert_eq!(normalize_line(b"\n"), "");
        assert_eq!(normalize_line(b"a\r\r\n"), "a\r");
    }

    #[test]
    fn normalize_tolerates_invalid_utf8() {
        assert_eq!(normalize_line(b"temp \xff ok\n"), "temp \u{fffd} ok");
    }

    #[test]
    fn demo_lines_are_deterministic() {
        assert_eq!(demo_line(0), "[00000.000] <info> app: Boot complete, firmware v1.4.2");
        assert_eq!(demo_line(1), "[00000.050] <debug> sensor: temp=23.37C humidity=41%");
        assert_eq!(demo_line(7), demo_line(7));
        assert!(demo_line(27).contains("<error> i2c"));
    }

    #[test]
    fn labels_name_the_source() {
        assert_eq!(LineSource::Stdin.label(), "stdin");
        assert_eq!(
            LineSource::Command(vec!["JLinkRTTClient".to_owned(), "-RTTTelnetPort".to_owned()]).label(),
            "JLinkRTTClient -RTTTelnetPort"
        );
    }

    #[test]
    fn reader_pushes_every_line_then_reports_closed() {
        let config = PipelineConfig {
            idle_poll: Duration::from_millis(5),
            ..PipelineConfig::default()
        };
        let (pipeline, drainer) = Pipeline::spawn(&config).expect("spawn");
        let (notice_tx, notice_rx) = unbounded();
        let input: &'static [u8] = b"one\r\n\x1b[32mtwo\x1b[0m\nthree";

        spawn_line_reader("test-reader", input, pipeline.handle(), notice_tx).expect("reader");
        assert_eq!(
            notice_rx.recv_timeout(Duration::from_secs(5)),
            Ok(SourceMessage::Closed)
        );

        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < 3 && Instant::now() < deadline {
            if let Some(batch) = drainer.drain() {
                seen.extend(batch.line_texts());
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(seen, vec!["one", "two", "three"]);

        pipeline.shutdown(&drainer).expect("clean shutdown");
    }

    #[test]
    fn dropping_the_guard_stops_the_demo() {
        let (pipeline, _drainer) = Pipeline::spawn(&PipelineConfig::default()).expect("spawn");
        let (notice_tx, notice_rx) = unbounded();
        let guard = spawn_source(
            &LineSource::Demo {
                lines_per_second: 200,
            },
            pipeline.handle(),
            notice_tx,
        )
        .expect("demo source");

        drop(guard);
        assert_eq!(
            notice_rx.recv_timeout(Duration::from_secs(5)),
            Ok(SourceMessage::Closed)
        );
    }

    #[cfg(unix)]
    #[test]
    fn failed_reader_setup_reaps_the_child() {
        use std::process::{Command, Stdio};

        use super::attach_stdout_reader;

        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn sleep");
        let pid = child.id() as libc::pid_t;
        let guard = SourceGuard {
            stop: None,
            child: Some(child),
        };

        let (pipeline, _drainer) = Pipeline::spawn(&PipelineConfig::default()).expect("spawn");
        let (notice_tx, _notice_rx) = unbounded();
        assert!(attach_stdout_reader(guard, pipeline.handle(), notice_tx).is_err());

        let alive = unsafe { libc::kill(pid, 0) } == 0;
        assert!(!alive, "child {pid} still running");
    }
}
