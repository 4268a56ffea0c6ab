//! Mode switching: in-band directives and the transition plan applied by
//! [`crate::control::SessionControl`].

use swesh_protocol::AgentMode;

pub const YOLO_DIRECTIVE: &str = "/y";
pub const CONFIRM_DIRECTIVE: &str = "/c";
pub const HUMAN_DIRECTIVE: &str = "/u";
pub const HELP_DIRECTIVE: &str = "/h";

/// Delivered to a pending confirmation prompt when the human takes over via a
/// key binding.
pub const SWITCHED_TO_HUMAN_REPLY: &str = "User switched to manual mode, this command will be ignored";

pub const HELP_TEXT: &str = "Current mode: {{mode}}
/y to switch to yolo mode (execute LM commands without confirmation)
/c to switch to confirmation mode (ask for confirmation before executing LM commands)
/u to switch to human mode (execute commands issued by the user)
/h to show this help
!<command> to run a shell command without leaving the current mode";

/// Text typed into a prompt that has a meaning of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Switch(AgentMode),
    Help,
}

impl Directive {
    /// Parse a prompt reply. Only the exact directive text matches; surrounding
    /// whitespace is not trimmed.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            YOLO_DIRECTIVE => Some(Directive::Switch(AgentMode::Yolo)),
            CONFIRM_DIRECTIVE => Some(Directive::Switch(AgentMode::Confirm)),
            HUMAN_DIRECTIVE => Some(Directive::Switch(AgentMode::Human)),
            HELP_DIRECTIVE => Some(Directive::Help),
            _ => None,
        }
    }
}

pub fn directive_for(mode: AgentMode) -> &'static str {
    match mode {
        AgentMode::Yolo => YOLO_DIRECTIVE,
        AgentMode::Confirm => CONFIRM_DIRECTIVE,
        AgentMode::Human => HUMAN_DIRECTIVE,
    }
}

pub fn help_text(mode: AgentMode) -> String {
    crate::templates::render(HELP_TEXT, &[("mode", &mode.to_string())])
}

/// Where a mode switch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeTrigger {
    /// The human typed a directive at a prompt. The prompt is already answered.
    Directive,
    /// The UI bound a key to the switch while the agent may be waiting.
    KeyBinding,
}

/// Outcome of a requested mode switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub next: AgentMode,
    /// Value to hand to the pending prompt, if it should be resolved.
    pub resolve_pending: Option<String>,
}

/// Compute the effect of switching from `current` to `target`.
///
/// A switch to the active mode changes nothing. A key-binding switch resolves
/// any pending prompt so the agent stops waiting: with the directive text when
/// leaving human mode (the agent reads it as a switch), with
/// [`SWITCHED_TO_HUMAN_REPLY`] when a confirmation is abandoned for human mode,
/// and with the empty string otherwise.
pub fn plan_transition(
    current: AgentMode,
    target: AgentMode,
    trigger: ModeTrigger,
    prompt_pending: bool,
) -> TransitionPlan {
    if current == target || trigger == ModeTrigger::Directive || !prompt_pending {
        return TransitionPlan {
            next: target,
            resolve_pending: None,
        };
    }
    let reply = match (current, target) {
        (AgentMode::Confirm, AgentMode::Human) => SWITCHED_TO_HUMAN_REPLY.to_string(),
        (AgentMode::Human, other) => directive_for(other).to_string(),
        _ => String::new(),
    };
    TransitionPlan {
        next: target,
        resolve_pending: Some(reply),
    }
}
