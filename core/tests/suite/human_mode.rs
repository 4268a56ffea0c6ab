use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use swesh_core::AgentEvent;
use swesh_core::SessionControl;
use swesh_core::agent::HUMAN_COMMAND_PROMPT;
use swesh_core::agent_event_channel;
use swesh_core::config::AgentConfig;
use swesh_core::gate::CONFIRM_PROMPT;
use swesh_core::mode::ModeTrigger;
use swesh_core::model::ReplayModel;
use swesh_core::model::UnconfiguredModel;
use swesh_core::spawn_agent;
use swesh_core::transcript::TranscriptItemKind;
use swesh_core::transcript::build;
use swesh_protocol::AgentMode;

use super::support::SUBMIT;
use super::support::ScriptedEnv;
use super::support::response;
use super::support::run_session;

fn human_config() -> AgentConfig {
    AgentConfig {
        mode: AgentMode::Human,
        confirm_exit: false,
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn human_commands_run_and_shell_escapes_stay_out_of_the_log() {
    let env = Arc::new(ScriptedEnv::default());
    let run = run_session(
        human_config(),
        Box::new(UnconfiguredModel),
        Arc::clone(&env),
        vec!["!echo hi", "ls", "/y"],
    )
    .await;

    assert_eq!(env.commands(), vec!["echo hi", "ls"]);
    assert_eq!(run.prompts, vec![HUMAN_COMMAND_PROMPT; 3]);
    // Leaving human mode hands control to the model, which is missing.
    assert_eq!(run.exit.exit_status, "NoModelConfigured");
    assert!(run.events.iter().any(|event| matches!(
        event,
        AgentEvent::ShellEscape { command, output } if command == "echo hi" && output == "hi\n"
    )));

    let items = build(&run.log);
    let tool_calls: Vec<&str> = items
        .iter()
        .filter(|item| item.kind == TranscriptItemKind::ToolCall)
        .map(|item| item.text.as_str())
        .collect();
    assert_eq!(tool_calls, vec!["ls"]);
}

#[tokio::test]
async fn switching_to_confirm_queries_the_model() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([response("pwd"), SUBMIT.to_string()]);
    let run = run_session(
        human_config(),
        Box::new(model),
        Arc::clone(&env),
        vec!["/c", "", ""],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Submitted");
    assert_eq!(
        run.prompts,
        vec![HUMAN_COMMAND_PROMPT, CONFIRM_PROMPT, CONFIRM_PROMPT]
    );
    assert_eq!(
        env.commands(),
        vec!["pwd", "echo COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT"]
    );
}

#[tokio::test]
async fn repeating_human_directive_prompts_again() {
    let env = Arc::new(ScriptedEnv::default());
    let run = run_session(
        human_config(),
        Box::new(UnconfiguredModel),
        Arc::clone(&env),
        vec!["/u", "whoami"],
    )
    .await;

    assert_eq!(env.commands(), vec!["whoami"]);
    assert_eq!(run.exit.exit_status, "Interrupted");
}

#[tokio::test]
async fn key_switch_to_human_during_confirmation_withholds_command() {
    let (tx, mut rx) = agent_event_channel();
    let config = AgentConfig {
        mode: AgentMode::Confirm,
        confirm_exit: false,
        ..AgentConfig::default()
    };
    let control = Arc::new(SessionControl::new(config.mode, tx.clone()));
    let env = Arc::new(ScriptedEnv::default());
    let handle = spawn_agent(
        config,
        Box::new(ReplayModel::new([response("rm -rf build")])),
        Arc::clone(&env) as Arc<dyn swesh_core::environment::Environment>,
        "clean up".to_string(),
        Arc::clone(&control),
        tx,
    )
    .expect("spawn agent");

    let mut prompts = 0;
    while let Some(event) = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("agent stalled")
    {
        match event {
            AgentEvent::PromptRequested { .. } => {
                prompts += 1;
                if prompts == 1 {
                    control.set_mode(AgentMode::Human, ModeTrigger::KeyBinding);
                } else {
                    control.cancel();
                }
            }
            AgentEvent::Finished { .. } => break,
            _ => {}
        }
    }

    let exit = handle.join.await.expect("join agent");
    assert_eq!(exit.exit_status, "Interrupted");
    assert!(env.commands().is_empty());
    let snapshot = handle.log.snapshot();
    assert!(snapshot.iter().any(|message| message.text()
        == "Command not executed: User switched to manual mode, this command will be ignored"));
    assert_eq!(control.mode(), AgentMode::Human);
}
