use swesh_protocol::AgentMode;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;

/// Everything the agent side tells the render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The message log grew to `len` entries.
    MessageAppended { len: usize },

    /// The agent is blocked waiting for a reply to `prompt`.
    PromptRequested { prompt: String },

    /// A pending prompt was answered or dropped.
    PromptResolved,

    ModeChanged { mode: AgentMode },

    /// Output of a `!command` typed at a prompt.
    ShellEscape { command: String, output: String },

    /// Informational text for the notice area (help text, warnings).
    Notice { text: String },

    /// The step loop ended. Always the last event.
    Finished { exit_status: String, result: String },
}

/// Cloneable, fire-and-forget sender for [`AgentEvent`]s.
#[derive(Clone, Debug)]
pub struct AgentEventSender {
    tx: UnboundedSender<AgentEvent>,
}

impl AgentEventSender {
    pub fn new(tx: UnboundedSender<AgentEvent>) -> Self {
        Self { tx }
    }

    /// Send an event. A closed receiver means the UI is gone; the event is
    /// dropped and the failure logged.
    pub fn send(&self, event: AgentEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("failed to send agent event: {e}");
        }
    }
}

pub fn agent_event_channel() -> (AgentEventSender, UnboundedReceiver<AgentEvent>) {
    let (tx, rx) = unbounded_channel();
    (AgentEventSender::new(tx), rx)
}
