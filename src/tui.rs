//! Terminal side: raw-mode guard, keyboard reader and screen drawing.

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, Read, Stdout, Write};
use std::thread;

use crossbeam_channel::Sender;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::controls::{Controls, Field, Key, Mode};
use crate::event::AnnotatedLine;
use crate::view::LogView;

const PAUSED_LABEL: &str = " (paused)";
const BODY_START_ROW: usize = 2;

#[derive(Debug)]
pub enum UiMessage {
    Key(Key),
    Quit,
    Error(String),
}

#[derive(Debug)]
enum InputParserState {
    Ground,
    Esc,
    Csi,
}

/// Turns raw tty bytes into key presses. Escape sequences are swallowed.
#[derive(Debug)]
pub struct InputParser {
    state: InputParserState,
}

impl InputParser {
    pub fn new() -> Self {
        Self {
            state: InputParserState::Ground,
        }
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            InputParserState::Ground => {
                if byte == 0x1b {
                    self.state = InputParserState::Esc;
                    return None;
                }

                key_from_byte(byte)
            }
            InputParserState::Esc => {
                if byte == b'[' {
                    self.state = InputParserState::Csi;
                } else {
                    self.state = InputParserState::Ground;
                }
                None
            }
            InputParserState::Csi => {
                if (0x40..=0x7e).contains(&byte) {
                    self.state = InputParserState::Ground;
                }
                None
            }
        }
    }
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

fn key_from_byte(byte: u8) -> Option<Key> {
    match byte {
        0x03 => Some(Key::Interrupt),
        b'\t' => Some(Key::Tab),
        b'\r' | b'\n' => Some(Key::Enter),
        0x08 | 0x7f => Some(Key::Backspace),
        0x15 => Some(Key::KillLine),
        0x20..=0x7e => Some(Key::Char(byte as char)),
        _ => None,
    }
}

pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter(stdout: &mut Stdout) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
    }
}

/// Reads keys from `/dev/tty` so stdin stays free for piped log lines.
pub fn spawn_ui_reader(tx: Sender<UiMessage>) -> io::Result<()> {
    let mut tty = OpenOptions::new().read(true).open("/dev/tty")?;

    thread::Builder::new()
        .name("rttview-keys".to_owned())
        .spawn(move || {
            let mut parser = InputParser::new();
            let mut buf = [0u8; 64];

            loop {
                match tty.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.send(UiMessage::Quit);
                        break;
                    }
                    Ok(n) => {
                        for byte in &buf[..n] {
                            if let Some(key) = parser.feed(*byte)
                                && tx.send(UiMessage::Key(key)).is_err()
                            {
                                return;
                            }
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        let _ = tx.send(UiMessage::Error(err.to_string()));
                        break;
                    }
                }
            }
        })?;

    Ok(())
}

/// Everything the header needs besides the view and controls.
#[derive(Debug, Clone, Copy)]
pub struct StatusLine<'a> {
    pub source: &'a str,
    pub status: &'a str,
}

pub fn clip_to_width(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    text.chars().take(width).collect()
}

pub fn clip_with_ellipsis(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let char_count = text.chars().count();
    if char_count <= width {
        return text.to_owned();
    }

    if width <= 3 {
        return ".".repeat(width);
    }

    let mut out = text.chars().take(width - 3).collect::<String>();
    out.push_str("...");
    out
}

/// Replaces control characters so log text cannot move the cursor. Tabs
/// become a space, anything else a replacement character.
pub fn printable(text: &str) -> Cow<'_, str> {
    if !text.chars().any(char::is_control) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(
        text.chars()
            .map(|ch| match ch {
                '\t' => ' ',
                ch if ch.is_control() => '\u{fffd}',
                ch => ch,
            })
            .collect(),
    )
}

pub fn first_body_row(body_start_row: usize, body_height: usize, visible_count: usize) -> usize {
    body_start_row + body_height.saturating_sub(visible_count)
}

fn input_field(label: &str, text: &str, editing: bool) -> String {
    if editing {
        format!("{}: {}_", label, text)
    } else {
        format!("{}: {}", label, text)
    }
}

#[derive(Debug, Clone, Copy)]
struct Style {
    fg: Option<Color>,
    bg: Option<Color>,
}

impl Style {
    const PLAIN: Style = Style { fg: None, bg: None };
    const DIM: Style = Style {
        fg: Some(Color::DarkGrey),
        bg: None,
    };
    const HIGHLIGHT: Style = Style {
        fg: Some(Color::Black),
        bg: Some(Color::Yellow),
    };

    fn fg(color: Color) -> Self {
        Self {
            fg: Some(color),
            bg: None,
        }
    }
}

fn draw_piece_clipped(
    stdout: &mut Stdout,
    x: &mut u16,
    y: u16,
    remaining: &mut usize,
    text: &str,
    style: Style,
) -> io::Result<()> {
    if *remaining == 0 {
        return Ok(());
    }

    let shown = clip_to_width(&printable(text), *remaining);
    if shown.is_empty() {
        return Ok(());
    }

    let width = shown.chars().count();
    queue!(stdout, MoveTo(*x, y))?;
    if let Some(color) = style.fg {
        queue!(stdout, SetForegroundColor(color))?;
    }
    if let Some(color) = style.bg {
        queue!(stdout, SetBackgroundColor(color))?;
    }
    queue!(stdout, Print(&shown))?;
    if style.fg.is_some() || style.bg.is_some() {
        queue!(stdout, ResetColor)?;
    }

    *x = x.saturating_add(width as u16);
    *remaining = remaining.saturating_sub(width);
    Ok(())
}

fn draw_line(stdout: &mut Stdout, y: u16, cols: usize, line: &AnnotatedLine) -> io::Result<()> {
    let mut x = 0u16;
    let mut remaining = cols;
    for run in &line.runs {
        let style = if run.highlighted {
            Style::HIGHLIGHT
        } else {
            Style::PLAIN
        };
        draw_piece_clipped(stdout, &mut x, y, &mut remaining, &run.text, style)?;
        if remaining == 0 {
            break;
        }
    }
    Ok(())
}

pub fn draw(
    stdout: &mut Stdout,
    view: &LogView,
    controls: &Controls,
    status: StatusLine<'_>,
) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    let cols_usize = cols as usize;
    let rows_usize = rows as usize;

    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;

    if rows_usize == 0 || cols_usize == 0 {
        stdout.flush()?;
        return Ok(());
    }

    let mut x = 0u16;
    let mut remaining = if controls.paused() {
        cols_usize.saturating_sub(PAUSED_LABEL.chars().count())
    } else {
        cols_usize
    };
    draw_piece_clipped(stdout, &mut x, 0, &mut remaining, " rttview ", Style::fg(Color::White))?;
    let counts = format!("│ {} lines │ {} ", view.len(), status.status);
    let source_budget = remaining.saturating_sub(counts.chars().count() + 3);
    let source = format!("│ {} ", clip_with_ellipsis(status.source, source_budget));
    draw_piece_clipped(stdout, &mut x, 0, &mut remaining, &source, Style::DIM)?;
    draw_piece_clipped(stdout, &mut x, 0, &mut remaining, &counts, Style::DIM)?;
    if controls.paused() {
        let mut label_room = PAUSED_LABEL.chars().count();
        draw_piece_clipped(
            stdout,
            &mut x,
            0,
            &mut label_room,
            PAUSED_LABEL,
            Style::fg(Color::Grey),
        )?;
    }

    if rows_usize >= 2 {
        let mut x = 0u16;
        let mut remaining = cols_usize;
        let editing = controls.mode();
        let field_style = |field: Field| {
            if editing == Mode::Editing(field) {
                Style::fg(Color::Yellow)
            } else {
                Style::PLAIN
            }
        };
        let filter = input_field(
            " Filter",
            controls.filter(),
            editing == Mode::Editing(Field::Filter),
        );
        let highlight = input_field(
            "   Highlight",
            controls.highlight(),
            editing == Mode::Editing(Field::Highlight),
        );
        draw_piece_clipped(stdout, &mut x, 1, &mut remaining, &filter, field_style(Field::Filter))?;
        draw_piece_clipped(
            stdout,
            &mut x,
            1,
            &mut remaining,
            &highlight,
            field_style(Field::Highlight),
        )?;
    }

    if rows_usize <= BODY_START_ROW {
        stdout.flush()?;
        return Ok(());
    }

    let body_height = rows_usize - BODY_START_ROW;
    let visible_count = view.len().min(body_height);
    let first_row = first_body_row(BODY_START_ROW, body_height, visible_count);
    for (screen_row, line) in view.tail(visible_count).enumerate() {
        draw_line(stdout, (first_row + screen_row) as u16, cols_usize, line)?;
    }

    stdout.flush()
}
