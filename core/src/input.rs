//! Reading a line from the human, with directives and `!` shell escapes
//! handled in place.

use crate::control::SessionControl;
use crate::environment::Environment;
use crate::error::EnvironmentError;
use crate::error::Result;
use crate::error::SweshErr;
use crate::events::AgentEvent;
use crate::events::AgentEventSender;
use crate::mode::Directive;
use crate::mode::ModeTrigger;
use crate::mode::help_text;

pub const SHELL_ESCAPE_PREFIX: char = '!';

/// Prompt until the human enters something the step loop should act on.
///
/// `!cmd` lines run `cmd` right away and prompt again, as does `/h`. Mode
/// directives switch the mode and are returned verbatim so the caller can see
/// what happened. Everything else is returned unchanged.
pub async fn collect_input(
    prompt: &str,
    control: &SessionControl,
    env: &dyn Environment,
    events: &AgentEventSender,
) -> Result<String> {
    loop {
        let line = control.request(prompt).await;
        if control.is_cancelled() {
            return Err(SweshErr::Interrupted);
        }

        if let Some(command) = line.strip_prefix(SHELL_ESCAPE_PREFIX) {
            let output = run_shell_escape(command, env).await?;
            events.send(AgentEvent::ShellEscape {
                command: command.to_string(),
                output,
            });
            continue;
        }

        match Directive::parse(&line) {
            Some(Directive::Help) => {
                events.send(AgentEvent::Notice {
                    text: help_text(control.mode()),
                });
            }
            Some(Directive::Switch(mode)) => {
                control.set_mode(mode, ModeTrigger::Directive);
                return Ok(line);
            }
            None => return Ok(line),
        }
    }
}

async fn run_shell_escape(command: &str, env: &dyn Environment) -> Result<String> {
    match env.execute(command).await {
        Ok(observation) => Ok(observation.output),
        Err(EnvironmentError::Timeout {
            timeout, output, ..
        }) => Ok(format!("{output}\n[timed out after {timeout:?}]")),
        Err(err) => Err(err.into()),
    }
}
