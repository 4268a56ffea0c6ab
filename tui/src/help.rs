use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Clear;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use unicode_width::UnicodeWidthStr;

use crate::render::Renderable;

/// Key bindings listed in the help overlay.
pub(crate) const KEY_BINDINGS: &[(&str, &str)] = &[
    ("Ctrl+Q / Ctrl+C / q", "Quit"),
    ("Ctrl+Y / y", "YOLO mode"),
    ("Ctrl+O / c", "Confirm mode"),
    ("Ctrl+U / u", "Human mode"),
    ("End", "Scroll to newest"),
    ("PgUp / PgDn / ↑ / ↓", "Scroll transcript"),
    ("Tab", "Toggle input focus"),
    ("Ctrl+T", "Multi-line input"),
    ("Ctrl+D", "Submit multi-line input"),
    ("F1 / ?", "Toggle this help"),
];

/// Bindings shown in the one-line footer.
pub(crate) const FOOTER: &str = "^Q quit · ^Y yolo · ^O confirm · ^U human · F1 help";

pub(crate) struct HelpOverlay;

impl HelpOverlay {
    fn lines() -> Vec<Line<'static>> {
        let key_width = KEY_BINDINGS
            .iter()
            .map(|(keys, _)| keys.width())
            .max()
            .unwrap_or(0);
        let mut lines: Vec<Line<'static>> = KEY_BINDINGS
            .iter()
            .map(|(keys, action)| {
                Line::from(vec![
                    format!("{keys}{}  ", " ".repeat(key_width - keys.width())).cyan(),
                    (*action).into(),
                ])
            })
            .collect();
        lines.push(Line::default());
        lines.push(Line::from(
            "Single-letter keys apply while the transcript has focus.".dim(),
        ));
        lines
    }

    fn area(outer: Rect) -> Rect {
        let lines = Self::lines();
        let width = lines
            .iter()
            .map(Line::width)
            .max()
            .unwrap_or(0)
            .saturating_add(4);
        let width = u16::try_from(width).unwrap_or(u16::MAX).min(outer.width);
        let height = u16::try_from(lines.len() + 2)
            .unwrap_or(u16::MAX)
            .min(outer.height);
        Rect {
            x: outer.x + (outer.width - width) / 2,
            y: outer.y + (outer.height - height) / 2,
            width,
            height,
        }
    }
}

impl Renderable for HelpOverlay {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        let popup = Self::area(area);
        Clear.render(popup, buf);
        Paragraph::new(Self::lines())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ".bold()),
            )
            .render(popup, buf);
    }

    fn desired_height(&self, _width: u16) -> u16 {
        u16::try_from(Self::lines().len() + 2).unwrap_or(u16::MAX)
    }
}
