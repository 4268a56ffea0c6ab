//! Short-lived notifications stacked above the status line.

use std::collections::VecDeque;
use std::time::Duration;
use std::time::Instant;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use swesh_core::notice::Notice;
use swesh_core::notice::NoticeLevel;

use crate::render::Renderable;

pub(crate) const MAX_VISIBLE_NOTICES: usize = 3;
pub(crate) const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Info,
    Warning,
    Error,
}

impl From<NoticeLevel> for Severity {
    fn from(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Warning => Severity::Warning,
            NoticeLevel::Error => Severity::Error,
        }
    }
}

struct Entry {
    severity: Severity,
    text: String,
    expires_at: Instant,
}

#[derive(Default)]
pub(crate) struct Notices {
    entries: VecDeque<Entry>,
}

impl Notices {
    pub(crate) fn push(&mut self, severity: Severity, text: impl Into<String>, now: Instant) {
        if self.entries.len() == MAX_VISIBLE_NOTICES {
            self.entries.pop_front();
        }
        self.entries.push_back(Entry {
            severity,
            text: text.into(),
            expires_at: now + NOTICE_TTL,
        });
    }

    pub(crate) fn push_log(&mut self, notice: Notice, now: Instant) {
        let severity = Severity::from(notice.level);
        let label = match severity {
            Severity::Error => "[ERROR]",
            _ => "[WARNING]",
        };
        self.push(severity, format!("{label} {}", notice.text), now);
    }

    /// Drop expired entries. Returns whether anything was removed.
    pub(crate) fn prune(&mut self, now: Instant) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.expires_at > now);
        self.entries.len() != before
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Renderable for Notices {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        let lines: Vec<Line<'static>> = self
            .entries
            .iter()
            .map(|entry| {
                let text = entry.text.clone();
                match entry.severity {
                    Severity::Info => Line::from(vec!["● ".cyan(), text.into()]),
                    Severity::Warning => Line::from(vec!["▲ ".yellow(), text.yellow()]),
                    Severity::Error => Line::from(vec!["■ ".red(), text.red()]),
                }
            })
            .collect();
        Paragraph::new(lines).render(area, buf);
    }

    fn desired_height(&self, _width: u16) -> u16 {
        u16::try_from(self.entries.len()).unwrap_or(u16::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn keeps_only_the_newest_three() {
        let now = Instant::now();
        let mut notices = Notices::default();
        for n in 0..5 {
            notices.push(Severity::Info, format!("notice {n}"), now);
        }
        assert_eq!(notices.len(), MAX_VISIBLE_NOTICES);

        let mut terminal = Terminal::new(TestBackend::new(20, 3)).expect("terminal");
        terminal
            .draw(|f| notices.render(f.area(), f.buffer_mut()))
            .expect("draw");
        assert_snapshot!(terminal.backend());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let now = Instant::now();
        let mut notices = Notices::default();
        notices.push(Severity::Info, "old", now);
        notices.push_log(
            Notice {
                level: NoticeLevel::Warning,
                text: "disk almost full".to_string(),
            },
            now + Duration::from_secs(3),
        );

        assert!(!notices.prune(now + Duration::from_secs(1)));
        assert!(notices.prune(now + NOTICE_TTL));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.desired_height(80), 1);
        assert!(notices.prune(now + Duration::from_secs(9)));
        assert_eq!(notices.len(), 0);
    }
}
