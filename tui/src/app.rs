use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre::Result;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use ratatui::buffer::Buffer;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::widgets::Widget;
use swesh_core::AgentEvent;
use swesh_core::AgentExit;
use swesh_core::MessageLog;
use swesh_core::RunStats;
use swesh_core::SessionControl;
use swesh_core::SessionState;
use swesh_core::SweshErr;
use swesh_core::mode::ModeTrigger;
use swesh_core::notice::Notice;
use swesh_core::transcript::TranscriptItem;
use swesh_core::transcript::TranscriptItemKind;
use swesh_core::transcript::build;
use swesh_protocol::AgentMode;
use tokio::select;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tracing::debug;
use tracing::info;

use crate::help::FOOTER;
use crate::help::HelpOverlay;
use crate::input_bar::InputBar;
use crate::input_bar::InputResult;
use crate::notices::Notices;
use crate::notices::Severity;
use crate::render::Renderable;
use crate::status_line::STATUS_REFRESH_INTERVAL;
use crate::status_line::StatusLine;
use crate::transcript_view::TranscriptView;
use crate::tui::FrameRequester;
use crate::tui::Tui;
use crate::tui::TuiEvent;

const SCROLL_STEP: u16 = 1;

/// How the session ended, printed once the terminal is restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppExitInfo {
    pub exit_status: String,
    pub result: String,
}

impl AppExitInfo {
    /// The agent never reported back, e.g. it was still stopping at shutdown.
    pub(crate) fn interrupted(result: String) -> Self {
        Self {
            exit_status: SweshErr::Interrupted.name().to_string(),
            result,
        }
    }
}

impl From<AgentExit> for AppExitInfo {
    fn from(exit: AgentExit) -> Self {
        Self {
            exit_status: exit.exit_status,
            result: exit.result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Input,
    Transcript,
}

pub(crate) struct App {
    control: Arc<SessionControl>,
    log: Arc<MessageLog>,
    stats: Arc<RunStats>,
    frame_requester: FrameRequester,

    state: SessionState,
    started_at: Instant,
    transcript: TranscriptView,
    /// Items that never reach the message log (shell escapes, help),
    /// anchored at the transcript length they were produced at.
    local_items: Vec<(usize, TranscriptItem)>,
    input: InputBar,
    notices: Notices,
    focus: Focus,
    show_help: bool,
    finished: Option<AppExitInfo>,
}

impl App {
    pub(crate) fn new(
        control: Arc<SessionControl>,
        log: Arc<MessageLog>,
        stats: Arc<RunStats>,
        frame_requester: FrameRequester,
    ) -> Self {
        Self {
            control,
            log,
            stats,
            frame_requester,
            state: SessionState::default(),
            started_at: Instant::now(),
            transcript: TranscriptView::new(),
            local_items: Vec::new(),
            input: InputBar::new(),
            notices: Notices::default(),
            focus: Focus::Transcript,
            show_help: false,
            finished: None,
        }
    }

    /// Drive the UI until the agent finishes or the user quits.
    pub(crate) async fn run(
        mut self,
        tui: &mut Tui,
        mut agent_events: UnboundedReceiver<AgentEvent>,
        mut notice_rx: UnboundedReceiver<Notice>,
    ) -> Result<Option<AppExitInfo>> {
        let mut tui_events = tui.event_stream();
        let mut status_tick = tokio::time::interval(STATUS_REFRESH_INTERVAL);
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.mount();
        self.draw(tui)?;

        while select! {
            Some(event) = agent_events.recv() => {
                self.handle_agent_event(event)
            }
            Some(notice) = notice_rx.recv() => {
                self.notices.push_log(notice, Instant::now());
                self.frame_requester.schedule_frame();
                true
            }
            Some(event) = tui_events.next() => {
                self.handle_tui_event(tui, event)?
            }
            _ = status_tick.tick() => {
                self.on_tick(Instant::now());
                true
            }
        } {}

        self.draw(tui)?;
        Ok(self.finished)
    }

    fn mount(&mut self) {
        self.state = self.state.mounted();
        self.refresh_transcript();
        self.sync_prompt();
    }

    fn handle_tui_event(&mut self, tui: &mut Tui, event: TuiEvent) -> Result<bool> {
        match event {
            TuiEvent::Key(key) => Ok(self.handle_key(key)),
            TuiEvent::Paste(pasted) => {
                if self.input_accepts_text() {
                    self.input.handle_paste(&pasted);
                    self.frame_requester.schedule_frame();
                }
                Ok(true)
            }
            TuiEvent::Draw => {
                self.draw(tui)?;
                Ok(true)
            }
        }
    }

    fn draw(&self, tui: &mut Tui) -> Result<()> {
        let now = Instant::now();
        tui.set_title(&self.status_line(now).title());
        tui.draw(|frame| self.render(now, frame.area(), frame.buffer_mut()))?;
        Ok(())
    }

    fn on_tick(&mut self, now: Instant) {
        self.notices.prune(now);
        self.frame_requester.schedule_frame();
    }

    /// Returns `false` once the loop should stop.
    fn handle_agent_event(&mut self, event: AgentEvent) -> bool {
        match event {
            AgentEvent::MessageAppended { .. } => self.refresh_transcript(),
            AgentEvent::PromptRequested { .. } | AgentEvent::PromptResolved => self.sync_prompt(),
            AgentEvent::ModeChanged { mode } => {
                let label = match mode {
                    AgentMode::Yolo => "YOLO",
                    AgentMode::Confirm => "Confirm",
                    AgentMode::Human => "Human",
                };
                self.notices
                    .push(Severity::Info, format!("{label} mode enabled"), Instant::now());
            }
            AgentEvent::ShellEscape { command, output } => {
                self.push_local(TranscriptItemKind::ToolCall, format!("!{command}"));
                self.push_local(TranscriptItemKind::ToolOutput, output);
            }
            AgentEvent::Notice { text } => self.push_local(TranscriptItemKind::System, text),
            AgentEvent::Finished {
                exit_status,
                result,
            } => {
                info!(%exit_status, "agent finished");
                self.state = self.state.stopped();
                self.input.set_prompt(None);
                self.notices.push(
                    Severity::Info,
                    format!("Agent finished: {exit_status}"),
                    Instant::now(),
                );
                self.transcript.scroll_to_end();
                self.refresh_transcript();
                self.finished = Some(AppExitInfo {
                    exit_status,
                    result,
                });
                return false;
            }
        }
        self.frame_requester.schedule_frame();
        true
    }

    /// Returns `false` when the key quits the session.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        self.frame_requester.schedule_frame();
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => return self.quit(),
            KeyCode::Char('y') if ctrl => self.switch_mode(AgentMode::Yolo),
            KeyCode::Char('o') if ctrl => self.switch_mode(AgentMode::Confirm),
            KeyCode::Char('u') if ctrl => self.switch_mode(AgentMode::Human),
            KeyCode::F(1) => self.show_help = !self.show_help,
            KeyCode::Esc if self.show_help => self.show_help = false,
            KeyCode::End => self.transcript.scroll_to_end(),
            KeyCode::PageUp => self.transcript.page_up(),
            KeyCode::PageDown => self.transcript.page_down(),
            KeyCode::Up => self.transcript.scroll_up(SCROLL_STEP),
            KeyCode::Down => self.transcript.scroll_down(SCROLL_STEP),
            KeyCode::Tab => self.toggle_focus(),
            _ if self.input_accepts_text() => {
                if let InputResult::Submitted(value) = self.input.handle_key(key) {
                    debug!("submitting reply to pending prompt");
                    self.control.fulfill(value);
                }
            }
            KeyCode::Char(c) if !ctrl => return self.handle_letter(c),
            _ => {}
        }
        true
    }

    /// Single-letter shortcuts, active while the input bar is not taking text.
    fn handle_letter(&mut self, c: char) -> bool {
        let prompt_open = self.input.has_prompt();
        match c {
            'q' if !prompt_open => return self.quit(),
            'y' => self.switch_mode(AgentMode::Yolo),
            'c' if !prompt_open => self.switch_mode(AgentMode::Confirm),
            'u' => self.switch_mode(AgentMode::Human),
            '?' => self.show_help = !self.show_help,
            _ => {}
        }
        true
    }

    fn switch_mode(&mut self, target: AgentMode) {
        let previous = self.control.set_mode(target, ModeTrigger::KeyBinding);
        debug!(from = %previous, to = %target, "mode switched from key binding");
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Transcript,
            Focus::Transcript if self.input.has_prompt() => Focus::Input,
            Focus::Transcript => Focus::Transcript,
        };
        self.input.set_focused(self.focus == Focus::Input);
    }

    fn quit(&mut self) -> bool {
        info!("user quit");
        self.control.cancel();
        self.state = self.state.stopped();
        false
    }

    fn input_accepts_text(&self) -> bool {
        self.focus == Focus::Input && self.input.has_prompt()
    }

    /// Mirror the prompt channel: the input bar shows whatever prompt is
    /// pending right now.
    fn sync_prompt(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        let pending = self.control.pending_prompt();
        let open = pending.is_some();
        self.input.set_prompt(pending);
        self.focus = if open { Focus::Input } else { Focus::Transcript };
        self.input.set_focused(open);
        self.state = self.state.with_prompt_pending(open);
    }

    fn push_local(&mut self, kind: TranscriptItemKind, text: String) {
        let anchor = build(&self.log.snapshot()).len();
        self.local_items.push((anchor, TranscriptItem { kind, text }));
        self.refresh_transcript();
    }

    fn refresh_transcript(&mut self) {
        let snapshot = self.log.snapshot();
        let items = interleave(build(&snapshot), &self.local_items);
        self.transcript.set_items(items);
    }

    fn status_line(&self, now: Instant) -> StatusLine {
        StatusLine {
            state: self.state,
            mode: self.control.mode(),
            cost: self.stats.cost(),
            elapsed: now.saturating_duration_since(self.started_at),
        }
    }

    fn render(&self, now: Instant, area: Rect, buf: &mut Buffer) {
        let status = self.status_line(now);
        let [transcript_area, notices_area, status_area, input_area, footer_area] =
            Layout::vertical([
                Constraint::Min(1),
                Constraint::Length(self.notices.desired_height(area.width)),
                Constraint::Length(status.desired_height(area.width)),
                Constraint::Length(self.input.desired_height(area.width)),
                Constraint::Length(1),
            ])
            .areas(area);

        self.transcript.render(transcript_area, buf);
        self.notices.render(notices_area, buf);
        status.render(status_area, buf);
        self.input.render(input_area, buf);
        Line::from(FOOTER.dim()).render(footer_area, buf);

        if self.show_help {
            HelpOverlay.render(area, buf);
        }
    }
}

/// Merge out-of-log items into the derived transcript. The builder is
/// prefix-stable, so an anchor recorded against an earlier snapshot is still
/// the right insertion point.
fn interleave(items: Vec<TranscriptItem>, local: &[(usize, TranscriptItem)]) -> Vec<TranscriptItem> {
    let mut merged = Vec::with_capacity(items.len() + local.len());
    let mut local = local.iter().peekable();
    for (idx, item) in items.into_iter().enumerate() {
        while let Some((_, extra)) = local.next_if(|(anchor, _)| *anchor <= idx) {
            merged.push(extra.clone());
        }
        merged.push(item);
    }
    merged.extend(local.map(|(_, extra)| extra.clone()));
    merged
}
