//! Scrollable view of the transcript derived from the message log.
//!
//! The view keeps no per-message state: every redraw receives the full list
//! of [`TranscriptItem`]s. Scrolling is tracked as a row offset plus a
//! `follow` flag; while following, the newest rows stay pinned to the bottom
//! no matter how much the transcript grows.
//!
//! Rows are counted in `usize` and only the items overlapping the viewport are
//! rendered, so very long sessions never hit the `u16` scroll limit of
//! [`Paragraph`].

use std::cell::Cell;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Paragraph;
use ratatui::widgets::Widget;
use ratatui::widgets::Wrap;
use swesh_core::transcript::TranscriptItem;
use swesh_core::transcript::TranscriptItemKind;

use crate::render::Renderable;

pub(crate) const EMPTY_TRANSCRIPT: &str = "Waiting for agent to start...";

#[derive(Debug, Default, Clone, Copy)]
struct Viewport {
    height: u16,
    max_scroll: usize,
}

pub(crate) struct TranscriptView {
    items: Vec<TranscriptItem>,
    scroll: usize,
    follow: bool,
    viewport: Cell<Viewport>,
}

impl Default for TranscriptView {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            scroll: 0,
            follow: true,
            viewport: Cell::new(Viewport::default()),
        }
    }
}

impl TranscriptView {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replace the items. The scroll position is kept unless the view was
    /// pinned to the newest row, in which case it stays pinned.
    pub(crate) fn set_items(&mut self, items: Vec<TranscriptItem>) {
        self.items = items;
    }

    #[cfg(test)]
    pub(crate) fn is_following(&self) -> bool {
        self.follow
    }

    pub(crate) fn scroll_to_end(&mut self) {
        self.follow = true;
    }

    pub(crate) fn scroll_up(&mut self, rows: u16) {
        let Viewport { max_scroll, .. } = self.viewport.get();
        self.scroll = self.offset(max_scroll).saturating_sub(usize::from(rows));
        self.follow = self.scroll >= max_scroll;
    }

    pub(crate) fn scroll_down(&mut self, rows: u16) {
        let Viewport { max_scroll, .. } = self.viewport.get();
        self.scroll = self
            .offset(max_scroll)
            .saturating_add(usize::from(rows))
            .min(max_scroll);
        self.follow = self.scroll >= max_scroll;
    }

    pub(crate) fn page_up(&mut self) {
        let page = self.viewport.get().height.saturating_sub(1).max(1);
        self.scroll_up(page);
    }

    pub(crate) fn page_down(&mut self) {
        let page = self.viewport.get().height.saturating_sub(1).max(1);
        self.scroll_down(page);
    }

    fn offset(&self, max_scroll: usize) -> usize {
        if self.follow {
            max_scroll
        } else {
            self.scroll.min(max_scroll)
        }
    }

    /// One wrapped paragraph per item with its height in rows. Every item but
    /// the first starts with a blank separator row.
    fn blocks(&self, width: u16) -> Vec<(Paragraph<'static>, usize)> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let mut lines = Vec::new();
                if idx > 0 {
                    lines.push(Line::default());
                }
                lines.extend(item_lines(item));
                let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
                let rows = paragraph.line_count(width);
                (paragraph, rows)
            })
            .collect()
    }
}

fn item_lines(item: &TranscriptItem) -> Vec<Line<'static>> {
    let (gutter, style): (Span<'static>, Style) = match item.kind {
        TranscriptItemKind::UserInput => ("› ".cyan().bold(), Style::new().bold()),
        TranscriptItemKind::AssistantReasoning => ("  ".into(), Style::new().magenta().italic()),
        TranscriptItemKind::AssistantOutput => ("  ".into(), Style::new()),
        TranscriptItemKind::ToolCall => ("$ ".green().bold(), Style::new().green()),
        TranscriptItemKind::ToolOutput => ("  ".into(), Style::new().dim()),
        TranscriptItemKind::System => ("! ".yellow().bold(), Style::new().yellow()),
    };
    item.text
        .lines()
        .enumerate()
        .map(|(idx, text)| {
            let prefix = if idx == 0 { gutter.clone() } else { "  ".into() };
            Line::from(vec![prefix, Span::styled(text.to_string(), style)])
        })
        .collect()
}

impl Renderable for TranscriptView {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        if self.items.is_empty() {
            self.viewport.set(Viewport {
                height: area.height,
                max_scroll: 0,
            });
            Paragraph::new(Line::from(EMPTY_TRANSCRIPT.dim())).render(area, buf);
            return;
        }

        let blocks = self.blocks(area.width);
        let total: usize = blocks.iter().map(|(_, rows)| rows).sum();
        let height = usize::from(area.height);
        let max_scroll = total.saturating_sub(height);
        self.viewport.set(Viewport {
            height: area.height,
            max_scroll,
        });

        let top = self.offset(max_scroll);
        let bottom = top + height;
        let mut start = 0;
        for (paragraph, rows) in blocks {
            let end = start + rows;
            if end > top && start < bottom {
                let skip = top.saturating_sub(start);
                let visible = end.min(bottom) - start.max(top);
                let rect = Rect {
                    x: area.x,
                    y: area.y + u16::try_from(start.saturating_sub(top)).unwrap_or(area.height),
                    width: area.width,
                    height: u16::try_from(visible).unwrap_or(area.height),
                };
                paragraph
                    .scroll((u16::try_from(skip).unwrap_or(u16::MAX), 0))
                    .render(rect, buf);
            }
            if end >= bottom {
                break;
            }
            start = end;
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        let rows: usize = self.blocks(width).iter().map(|(_, rows)| rows).sum();
        u16::try_from(rows).unwrap_or(u16::MAX)
    }
}
