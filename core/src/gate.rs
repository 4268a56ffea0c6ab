//! Confirmation gate: decides whether a proposed command may run.

use regex_lite::Regex;
use swesh_protocol::Action;
use swesh_protocol::AgentMode;

use crate::control::SessionControl;
use crate::error::Result;
use crate::error::SweshErr;
use crate::mode::CONFIRM_DIRECTIVE;
use crate::mode::HUMAN_DIRECTIVE;
use crate::mode::ModeTrigger;
use crate::mode::YOLO_DIRECTIVE;

pub const CONFIRM_PROMPT: &str = "Press ENTER to confirm or provide rejection reason";
pub const HUMAN_MODE_REFUSAL: &str = "Command not executed because user switched to manual mode.";
pub const SWITCH_TO_HUMAN_REFUSAL: &str = "Command not executed. Switching to human mode";

/// Commands that run in `confirm` mode without asking.
///
/// Patterns are regular expressions anchored at the start of the command,
/// tried in order.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    patterns: Vec<Regex>,
}

impl Whitelist {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
                    SweshErr::InvalidWhitelistPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, command: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(command))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Execute,
    /// Do not run the command; the reason is shown to the model.
    Withhold(String),
}

/// Decide whether `action` may run in `mode`.
///
/// `from_human` must be true only when the action was typed by the human
/// during this step.
pub async fn should_execute(
    action: &Action,
    mode: AgentMode,
    whitelist: &Whitelist,
    from_human: bool,
    control: &SessionControl,
) -> GateDecision {
    match mode {
        AgentMode::Yolo => GateDecision::Execute,
        AgentMode::Human if from_human => GateDecision::Execute,
        AgentMode::Human => GateDecision::Withhold(HUMAN_MODE_REFUSAL.to_string()),
        AgentMode::Confirm => {
            if action.is_empty() || whitelist.matches(&action.command) {
                return GateDecision::Execute;
            }
            let reply = control.request(CONFIRM_PROMPT).await;
            match reply.as_str() {
                "" => GateDecision::Execute,
                YOLO_DIRECTIVE => {
                    control.set_mode(AgentMode::Yolo, ModeTrigger::Directive);
                    GateDecision::Execute
                }
                CONFIRM_DIRECTIVE => GateDecision::Execute,
                HUMAN_DIRECTIVE => {
                    control.set_mode(AgentMode::Human, ModeTrigger::Directive);
                    GateDecision::Withhold(SWITCH_TO_HUMAN_REFUSAL.to_string())
                }
                reason => GateDecision::Withhold(format!("Command not executed: {reason}")),
            }
        }
    }
}
