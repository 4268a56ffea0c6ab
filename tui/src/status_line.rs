//! One-line summary of the session under the transcript.

use std::time::Duration;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use swesh_core::SessionState;
use swesh_protocol::AgentMode;

use crate::render::Renderable;

/// How often the status line is redrawn while the session is alive.
pub(crate) const STATUS_REFRESH_INTERVAL: Duration = Duration::from_millis(125);

const SPINNER_BLINK: Duration = Duration::from_millis(600);

pub(crate) struct StatusLine {
    pub state: SessionState,
    pub mode: AgentMode,
    pub cost: f64,
    pub elapsed: Duration,
}

impl StatusLine {
    fn line(&self) -> Line<'static> {
        let state = self.state.to_string();
        let state = match self.state {
            SessionState::Running => state.cyan().bold(),
            SessionState::AwaitingInput => state.yellow().bold(),
            SessionState::Stopped => state.red().bold(),
            SessionState::Uninitialized => state.dim(),
        };
        let mut spans: Vec<Span<'static>> = vec![state];
        if self.state == SessionState::Running {
            spans.push(" ".into());
            spans.push(spinner(self.elapsed).cyan());
        }
        spans.extend([
            " · ".dim(),
            format!("mode={}", self.mode).into(),
            " · ".dim(),
            format!("cost=${:.2}", self.cost).into(),
            " · ".dim(),
            fmt_elapsed_compact(self.elapsed.as_secs()).dim(),
        ]);
        Line::from(spans)
    }

    /// Text for the terminal window title.
    pub(crate) fn title(&self) -> String {
        format!("swesh - {}", self.state)
    }
}

impl Renderable for StatusLine {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line()).render(area, buf);
    }

    fn desired_height(&self, _width: u16) -> u16 {
        1
    }
}

fn spinner(elapsed: Duration) -> Span<'static> {
    let phase = elapsed.as_millis() / SPINNER_BLINK.as_millis();
    if phase % 2 == 0 { "•".into() } else { "◦".into() }
}

pub(crate) fn fmt_elapsed_compact(elapsed_secs: u64) -> String {
    if elapsed_secs < 60 {
        return format!("{elapsed_secs}s");
    }
    if elapsed_secs < 3600 {
        let minutes = elapsed_secs / 60;
        let seconds = elapsed_secs % 60;
        return format!("{minutes}m {seconds:02}s");
    }
    let hours = elapsed_secs / 3600;
    let minutes = (elapsed_secs % 3600) / 60;
    let seconds = elapsed_secs % 60;
    format!("{hours}h {minutes:02}m {seconds:02}s")
}
