use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use swesh_core::AgentEvent;
use swesh_core::AgentExit;
use swesh_core::SessionControl;
use swesh_core::agent_event_channel;
use swesh_core::config::AgentConfig;
use swesh_core::environment::Environment;
use swesh_core::error::EnvironmentError;
use swesh_core::model::Model;
use swesh_core::spawn_agent;
use swesh_protocol::Message;
use swesh_protocol::Observation;

pub const SUBMIT: &str = "THOUGHT: done\n\n```bash\necho COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT\n```";

pub fn response(command: &str) -> String {
    format!("THOUGHT: next step\n\n```bash\n{command}\n```")
}

/// Records every command. `echo X` prints `X`; commands listed in
/// `timeouts` time out; anything else prints `ran <command>`.
#[derive(Default)]
pub struct ScriptedEnv {
    pub commands: Mutex<Vec<String>>,
    pub timeouts: HashMap<String, String>,
}

impl ScriptedEnv {
    pub fn with_timeout(command: &str, partial_output: &str) -> Self {
        Self {
            timeouts: HashMap::from([(command.to_string(), partial_output.to_string())]),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().expect("lock").clone()
    }
}

#[async_trait]
impl Environment for ScriptedEnv {
    async fn execute(&self, command: &str) -> Result<Observation, EnvironmentError> {
        self.commands
            .lock()
            .expect("lock")
            .push(command.to_string());
        if let Some(output) = self.timeouts.get(command) {
            return Err(EnvironmentError::Timeout {
                command: command.to_string(),
                timeout: Duration::from_secs(30),
                output: output.clone(),
            });
        }
        let output = match command.strip_prefix("echo ") {
            Some(text) => format!("{text}\n"),
            None => format!("ran {command}\n"),
        };
        Ok(Observation::new(0, output))
    }
}

pub struct SessionRun {
    pub exit: AgentExit,
    pub log: Vec<Message>,
    pub prompts: Vec<String>,
    pub events: Vec<AgentEvent>,
}

impl SessionRun {
    pub fn user_texts(&self) -> Vec<String> {
        self.log
            .iter()
            .filter(|message| message.role == swesh_protocol::Role::User)
            .map(Message::text)
            .collect()
    }
}

/// Run a whole session, answering prompts from `replies` in order. When the
/// replies run out the session is cancelled, as if the user quit.
pub async fn run_session(
    config: AgentConfig,
    model: Box<dyn Model>,
    env: Arc<ScriptedEnv>,
    replies: Vec<&str>,
) -> SessionRun {
    let (tx, mut rx) = agent_event_channel();
    let control = Arc::new(SessionControl::new(config.mode, tx.clone()));
    let handle = spawn_agent(
        config,
        model,
        env,
        "fix the bug".to_string(),
        Arc::clone(&control),
        tx,
    )
    .expect("spawn agent");

    let mut replies = replies.into_iter().map(str::to_string);
    let mut prompts = Vec::new();
    let mut events = Vec::new();
    while let Some(event) = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("agent stalled")
    {
        let finished = matches!(event, AgentEvent::Finished { .. });
        if let AgentEvent::PromptRequested { prompt } = &event {
            prompts.push(prompt.clone());
            match replies.next() {
                Some(reply) => {
                    control.fulfill(reply);
                }
                None => control.cancel(),
            }
        }
        events.push(event);
        if finished {
            break;
        }
    }

    let exit = handle.join.await.expect("join agent");
    SessionRun {
        exit,
        log: handle.log.snapshot().as_ref().clone(),
        prompts,
        events,
    }
}
