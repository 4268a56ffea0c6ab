//! Docked input bar that answers the agent's prompts.

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use ratatui::widgets::Wrap;

use crate::render::Renderable;

const SINGLE_LINE_HINT: &str = "Enter submit · Ctrl+T multiline · Tab focus";
const MULTI_LINE_HINT: &str = "Ctrl+D submit · Tab focus";
const IDLE_HINT: &str = "Agent is working · ? help";
const MAX_TEXT_ROWS: u16 = 8;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InputResult {
    Submitted(String),
    None,
}

#[derive(Default)]
pub(crate) struct InputBar {
    prompt: Option<String>,
    text: String,
    multiline: bool,
    focused: bool,
}

impl InputBar {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Show `prompt` (or hide the prompt row when `None`). A new prompt
    /// starts with an empty single-line buffer.
    pub(crate) fn set_prompt(&mut self, prompt: Option<String>) {
        if self.prompt != prompt {
            self.text.clear();
            self.multiline = false;
        }
        self.prompt = prompt;
    }

    pub(crate) fn has_prompt(&self) -> bool {
        self.prompt.is_some()
    }

    pub(crate) fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    #[cfg(test)]
    pub(crate) fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) -> InputResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('t') if ctrl => {
                self.multiline = true;
                InputResult::None
            }
            KeyCode::Char('d') if ctrl && self.multiline => self.submit(),
            KeyCode::Enter if self.multiline => {
                self.text.push('\n');
                InputResult::None
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.text.pop();
                InputResult::None
            }
            KeyCode::Char(c) if !ctrl => {
                self.text.push(c);
                InputResult::None
            }
            _ => InputResult::None,
        }
    }

    /// Bracketed paste. Multi-line pastes switch to multi-line editing so the
    /// newlines are kept.
    pub(crate) fn handle_paste(&mut self, pasted: &str) {
        let pasted = pasted.replace("\r\n", "\n").replace('\r', "\n");
        if pasted.contains('\n') {
            self.multiline = true;
        }
        self.text.push_str(&pasted);
    }

    fn submit(&mut self) -> InputResult {
        let value = self.text.trim().to_string();
        self.text.clear();
        self.multiline = false;
        InputResult::Submitted(value)
    }

    fn hint(&self) -> &'static str {
        match (self.prompt.is_some(), self.multiline) {
            (false, _) => IDLE_HINT,
            (true, true) => MULTI_LINE_HINT,
            (true, false) => SINGLE_LINE_HINT,
        }
    }

    fn text_rows(&self) -> u16 {
        let rows = self.text.split('\n').count();
        u16::try_from(rows).unwrap_or(u16::MAX).clamp(1, MAX_TEXT_ROWS)
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        if let Some(prompt) = &self.prompt {
            lines.push(Line::from(prompt.clone().bold()));
            let mut text_lines: Vec<Line<'static>> = self
                .text
                .split('\n')
                .map(|row| Line::from(row.to_string()))
                .collect();
            if self.focused
                && let Some(last) = text_lines.last_mut()
            {
                last.push_span("▌".cyan());
            }
            lines.extend(text_lines);
        }
        lines.push(Line::from(self.hint().dim()));
        lines
    }
}

impl Renderable for InputBar {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        let border = if self.focused && self.prompt.is_some() {
            Block::default().borders(Borders::TOP).cyan()
        } else {
            Block::default().borders(Borders::TOP).dim()
        };
        let lines = self.lines();
        let skip = lines.len().saturating_sub(usize::from(area.height.saturating_sub(1)));
        Paragraph::new(lines.into_iter().skip(skip).collect::<Vec<_>>())
            .wrap(Wrap { trim: false })
            .block(border)
            .render(area, buf);
    }

    fn desired_height(&self, _width: u16) -> u16 {
        if self.prompt.is_some() {
            // border + prompt + text + hint
            self.text_rows() + 3
        } else {
            2
        }
    }
}
