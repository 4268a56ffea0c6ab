use std::sync::Arc;

use pretty_assertions::assert_eq;
use swesh_core::AgentEvent;
use swesh_core::agent::EXIT_PROMPT;
use swesh_core::config::AgentConfig;
use swesh_core::gate::CONFIRM_PROMPT;
use swesh_core::model::ReplayModel;
use swesh_core::transcript::TranscriptItemKind;
use swesh_core::transcript::build;
use swesh_protocol::AgentMode;
use swesh_protocol::Role;

use super::support::SUBMIT;
use super::support::ScriptedEnv;
use super::support::response;
use super::support::run_session;

fn config(mode: AgentMode) -> AgentConfig {
    AgentConfig {
        mode,
        confirm_exit: false,
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn yolo_runs_commands_and_submits() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([response("ls"), SUBMIT.to_string()]);
    let run = run_session(
        config(AgentMode::Yolo),
        Box::new(model),
        Arc::clone(&env),
        vec![],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Submitted");
    assert_eq!(
        env.commands(),
        vec!["ls", "echo COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT"]
    );
    assert!(run.prompts.is_empty());
    assert_eq!(run.log[0].role, Role::System);
    assert!(run.log[1].text().contains("fix the bug"));

    let kinds: Vec<TranscriptItemKind> = build(&run.log).iter().map(|item| item.kind).collect();
    assert_eq!(
        kinds[..4].to_vec(),
        vec![
            TranscriptItemKind::UserInput,
            TranscriptItemKind::AssistantReasoning,
            TranscriptItemKind::ToolCall,
            TranscriptItemKind::ToolOutput,
        ]
    );
    assert!(matches!(
        run.events.last(),
        Some(AgentEvent::Finished { exit_status, .. }) if exit_status == "Submitted"
    ));
}

#[tokio::test]
async fn confirm_mode_rejection_is_reported_to_model() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([response("rm -rf build"), SUBMIT.to_string()]);
    let run = run_session(
        config(AgentMode::Confirm),
        Box::new(model),
        Arc::clone(&env),
        vec!["too risky", ""],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Submitted");
    assert_eq!(run.prompts, vec![CONFIRM_PROMPT, CONFIRM_PROMPT]);
    assert_eq!(
        env.commands(),
        vec!["echo COMPLETE_TASK_AND_SUBMIT_FINAL_OUTPUT"]
    );
    assert!(
        run.user_texts()
            .contains(&"Command not executed: too risky".to_string())
    );
}

#[tokio::test]
async fn whitelisted_commands_skip_confirmation() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([response("ls -la"), SUBMIT.to_string()]);
    let config = AgentConfig {
        whitelist_actions: vec!["ls".to_string(), "echo ".to_string()],
        ..config(AgentMode::Confirm)
    };
    let run = run_session(config, Box::new(model), Arc::clone(&env), vec![]).await;

    assert_eq!(run.exit.exit_status, "Submitted");
    assert!(run.prompts.is_empty());
    assert_eq!(env.commands().len(), 2);
}

#[tokio::test]
async fn malformed_response_asks_model_to_fix_format() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new(["I think we are done.".to_string(), SUBMIT.to_string()]);
    let run = run_session(
        config(AgentMode::Yolo),
        Box::new(model),
        Arc::clone(&env),
        vec![],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Submitted");
    assert!(
        run.user_texts()
            .iter()
            .any(|text| text.contains("EXACTLY ONE action in triple backticks, found 0 actions"))
    );
}

#[tokio::test]
async fn step_limit_stops_the_session() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([response("ls"), response("pwd")]);
    let config = AgentConfig {
        step_limit: 1,
        ..config(AgentMode::Yolo)
    };
    let run = run_session(config, Box::new(model), Arc::clone(&env), vec![]).await;

    assert_eq!(run.exit.exit_status, "LimitsExceeded");
    assert_eq!(env.commands(), vec!["ls"]);
    let last = build(&run.log).pop().expect("transcript item");
    assert_eq!(last.kind, TranscriptItemKind::System);
    assert!(last.text.starts_with("LimitsExceeded"));
}

#[tokio::test]
async fn cost_limit_stops_the_session() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::with_costs([(response("ls"), 2.0), (response("pwd"), 2.0)]);
    let config = AgentConfig {
        cost_limit: 1.0,
        ..config(AgentMode::Yolo)
    };
    let run = run_session(config, Box::new(model), Arc::clone(&env), vec![]).await;

    assert_eq!(run.exit.exit_status, "LimitsExceeded");
    assert_eq!(env.commands(), vec!["ls"]);
}

#[tokio::test]
async fn timeout_is_reported_and_loop_continues() {
    let env = Arc::new(ScriptedEnv::with_timeout("sleep 100", "partial"));
    let model = ReplayModel::new([response("sleep 100"), SUBMIT.to_string()]);
    let run = run_session(
        config(AgentMode::Yolo),
        Box::new(model),
        Arc::clone(&env),
        vec![],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Submitted");
    let timeout_notice = run
        .user_texts()
        .into_iter()
        .find(|text| text.contains("timed out"))
        .expect("timeout notice");
    assert!(timeout_notice.contains("<command>sleep 100</command>"));
    assert!(timeout_notice.contains("partial"));
}

#[tokio::test]
async fn follow_up_task_continues_the_session() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([SUBMIT.to_string(), SUBMIT.to_string()]);
    let config = AgentConfig {
        confirm_exit: true,
        ..config(AgentMode::Yolo)
    };
    let run = run_session(
        config,
        Box::new(model),
        Arc::clone(&env),
        vec!["also add tests", ""],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Submitted");
    assert_eq!(run.prompts, vec![EXIT_PROMPT, EXIT_PROMPT]);
    assert!(
        run.user_texts()
            .contains(&"The user added a new task: also add tests".to_string())
    );
    assert_eq!(env.commands().len(), 2);
}

#[tokio::test]
async fn quitting_at_a_prompt_interrupts_the_session() {
    let env = Arc::new(ScriptedEnv::default());
    let model = ReplayModel::new([response("rm -rf build")]);
    let run = run_session(
        config(AgentMode::Confirm),
        Box::new(model),
        Arc::clone(&env),
        vec![],
    )
    .await;

    assert_eq!(run.exit.exit_status, "Interrupted");
    assert!(env.commands().is_empty());
}
