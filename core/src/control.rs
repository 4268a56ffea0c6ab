//! Shared state between the step loop and the render loop: the active mode
//! and the single pending prompt.
//!
//! Both live behind one mutex so a UI mode switch and an agent prompt request
//! can never interleave halfway. Replies travel over a `oneshot` channel, which
//! keeps the value even when [`SessionControl::fulfill`] runs before the agent
//! starts awaiting it.

use std::sync::Mutex;
use std::sync::MutexGuard;

use swesh_protocol::AgentMode;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::events::AgentEvent;
use crate::events::AgentEventSender;
use crate::mode::ModeTrigger;
use crate::mode::plan_transition;

struct PendingPrompt {
    prompt: String,
    respond_to: oneshot::Sender<String>,
}

struct ControlState {
    mode: AgentMode,
    pending: Option<PendingPrompt>,
    closed: bool,
}

pub struct SessionControl {
    state: Mutex<ControlState>,
    cancel: CancellationToken,
    events: AgentEventSender,
}

impl SessionControl {
    pub fn new(mode: AgentMode, events: AgentEventSender) -> Self {
        Self {
            state: Mutex::new(ControlState {
                mode,
                pending: None,
                closed: false,
            }),
            cancel: CancellationToken::new(),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn mode(&self) -> AgentMode {
        self.lock().mode
    }

    /// Text of the prompt the agent is currently blocked on, if any.
    pub fn pending_prompt(&self) -> Option<String> {
        self.lock()
            .pending
            .as_ref()
            .map(|pending| pending.prompt.clone())
    }

    /// Block until the UI supplies a reply to `prompt`.
    ///
    /// Returns the empty string if the session is (or becomes) cancelled while
    /// waiting.
    pub async fn request(&self, prompt: impl Into<String>) -> String {
        let prompt = prompt.into();
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.lock();
            if state.closed {
                return String::new();
            }
            let previous = state.pending.replace(PendingPrompt {
                prompt: prompt.clone(),
                respond_to: tx,
            });
            if let Some(previous) = previous {
                warn!(prompt = %previous.prompt, "replacing unresolved prompt");
                previous.respond_to.send(String::new()).ok();
            }
        }
        self.events.send(AgentEvent::PromptRequested { prompt });
        rx.await.unwrap_or_default()
    }

    /// Deliver `value` to the pending prompt. Returns `false` (and does
    /// nothing) when no prompt is pending.
    pub fn fulfill(&self, value: impl Into<String>) -> bool {
        let pending = self.lock().pending.take();
        match pending {
            Some(pending) => {
                pending.respond_to.send(value.into()).ok();
                self.events.send(AgentEvent::PromptResolved);
                true
            }
            None => {
                debug!("no pending prompt to fulfill");
                false
            }
        }
    }

    /// Switch to `target`, releasing a pending prompt when the transition
    /// calls for it. Returns the previous mode.
    pub fn set_mode(&self, target: AgentMode, trigger: ModeTrigger) -> AgentMode {
        let (previous, resolved) = {
            let mut state = self.lock();
            let previous = state.mode;
            let plan = plan_transition(previous, target, trigger, state.pending.is_some());
            state.mode = plan.next;
            let mut resolved = false;
            if let Some(reply) = plan.resolve_pending
                && let Some(pending) = state.pending.take()
            {
                pending.respond_to.send(reply).ok();
                resolved = true;
            }
            (previous, resolved)
        };
        if previous != target {
            debug!(from = %previous, to = %target, ?trigger, "mode changed");
            self.events.send(AgentEvent::ModeChanged { mode: target });
        }
        if resolved {
            self.events.send(AgentEvent::PromptResolved);
        }
        previous
    }

    /// Stop the session: release any pending prompt with an empty reply,
    /// refuse further prompts and signal the step loop to stop.
    pub fn cancel(&self) {
        let pending = {
            let mut state = self.lock();
            state.closed = true;
            state.pending.take()
        };
        if let Some(pending) = pending {
            pending.respond_to.send(String::new()).ok();
            self.events.send(AgentEvent::PromptResolved);
        }
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
