//! Keyboard state for the filter/highlight fields and the pause toggle.

/// A decoded key press from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Enter,
    Tab,
    KillLine,
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Filter,
    Highlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Editing(Field),
}

/// What the app should do in response to a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Nothing,
    Redraw,
    Quit,
    SetPaused(bool),
    SetFilter(String),
    SetHighlight(String),
    Clear,
}

#[derive(Debug)]
pub struct Controls {
    mode: Mode,
    filter: String,
    highlight: String,
    paused: bool,
}

impl Controls {
    pub fn new(filter: String, highlight: String) -> Self {
        Self {
            mode: Mode::Normal,
            filter,
            highlight,
            paused: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn highlight(&self) -> &str {
        &self.highlight
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn on_key(&mut self, key: Key) -> Action {
        if key == Key::Interrupt {
            return Action::Quit;
        }

        match self.mode {
            Mode::Normal => self.on_normal_key(key),
            Mode::Editing(field) => self.on_edit_key(field, key),
        }
    }

    fn on_normal_key(&mut self, key: Key) -> Action {
        match key {
            Key::Char(' ') => {
                self.paused = !self.paused;
                Action::SetPaused(self.paused)
            }
            Key::Char('f') | Key::Char('F') | Key::Char('/') => {
                self.mode = Mode::Editing(Field::Filter);
                Action::Redraw
            }
            Key::Char('h') | Key::Char('H') => {
                self.mode = Mode::Editing(Field::Highlight);
                Action::Redraw
            }
            Key::Char('c') | Key::Char('C') => Action::Clear,
            Key::Char('q') | Key::Char('Q') => Action::Quit,
            _ => Action::Nothing,
        }
    }

    fn on_edit_key(&mut self, field: Field, key: Key) -> Action {
        let text = match field {
            Field::Filter => &mut self.filter,
            Field::Highlight => &mut self.highlight,
        };

        let changed = match key {
            Key::Char(ch) => {
                text.push(ch);
                true
            }
            Key::Backspace => text.pop().is_some(),
            Key::KillLine => {
                let had_text = !text.is_empty();
                text.clear();
                had_text
            }
            Key::Enter | Key::Tab => {
                self.mode = Mode::Normal;
                return Action::Redraw;
            }
            Key::Interrupt => return Action::Quit,
        };

        if !changed {
            return Action::Nothing;
        }

        match field {
            Field::Filter => Action::SetFilter(self.filter.clone()),
            Field::Highlight => Action::SetHighlight(self.highlight.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, Controls, Field, Key, Mode};

    fn type_text(controls: &mut Controls, text: &str) -> Vec<Action> {
        text.chars().map(|ch| controls.on_key(Key::Char(ch))).collect()
    }

    #[test]
    fn space_toggles_pause_in_normal_mode() {
        let mut controls = Controls::new(String::new(), String::new());
        assert_eq!(controls.on_key(Key::Char(' ')), Action::SetPaused(true));
        assert!(controls.paused());
        assert_eq!(controls.on_key(Key::Char(' ')), Action::SetPaused(false));
        assert!(!controls.paused());
    }

    #[test]
    fn filter_edits_are_sent_per_keystroke() {
        let mut controls = Controls::new(String::new(), String::new());
        assert_eq!(controls.on_key(Key::Char('/')), Action::Redraw);
        assert_eq!(controls.mode(), Mode::Editing(Field::Filter));

        let actions = type_text(&mut controls, "er");
        assert_eq!(
            actions,
            vec![
                Action::SetFilter("e".to_owned()),
                Action::SetFilter("er".to_owned())
            ]
        );

        assert_eq!(
            controls.on_key(Key::Backspace),
            Action::SetFilter("e".to_owned())
        );
        assert_eq!(controls.on_key(Key::Enter), Action::Redraw);
        assert_eq!(controls.mode(), Mode::Normal);
        assert_eq!(controls.filter(), "e");
    }

    #[test]
    fn typing_space_while_editing_does_not_pause() {
        let mut controls = Controls::new(String::new(), String::new());
        controls.on_key(Key::Char('h'));
        assert_eq!(
            controls.on_key(Key::Char(' ')),
            Action::SetHighlight(" ".to_owned())
        );
        assert!(!controls.paused());
    }

    #[test]
    fn kill_line_clears_field_once() {
        let mut controls = Controls::new("boot".to_owned(), String::new());
        controls.on_key(Key::Char('f'));
        assert_eq!(controls.on_key(Key::KillLine), Action::SetFilter(String::new()));
        assert_eq!(controls.on_key(Key::KillLine), Action::Nothing);
        assert_eq!(controls.on_key(Key::Backspace), Action::Nothing);
    }

    #[test]
    fn normal_mode_commands() {
        let mut controls = Controls::new(String::new(), String::new());
        assert_eq!(controls.on_key(Key::Char('c')), Action::Clear);
        assert_eq!(controls.on_key(Key::Char('x')), Action::Nothing);
        assert_eq!(controls.on_key(Key::Char('q')), Action::Quit);
    }

    #[test]
    fn interrupt_quits_from_any_mode() {
        let mut controls = Controls::new(String::new(), String::new());
        controls.on_key(Key::Char('f'));
        assert_eq!(controls.on_key(Key::Interrupt), Action::Quit);
    }
}
