//! Turns the raw message log into display rows.
//!
//! The log does not say what a message *is*: the agent writes the task, tool
//! observations and injected notices all with the `user` role. The builder
//! recovers the semantic kind with a few textual heuristics. It is a pure
//! function of its input and is re-run from scratch on every redraw.

use std::sync::LazyLock;

use regex_lite::Regex;
use swesh_protocol::Message;
use swesh_protocol::Role;
use swesh_protocol::exec::OUTPUT_CLOSE_TAG;
use swesh_protocol::exec::OUTPUT_OPEN_TAG;
use swesh_protocol::exec::RETURNCODE_OPEN_TAG;
use swesh_protocol::exec::WARNING_CLOSE_TAG;
use swesh_protocol::exec::WARNING_OPEN_TAG;

/// Presence of this token before the command marks the text as reasoning.
pub const REASONING_MARKER: &str = "THOUGHT:";
const OBSERVATION_PREFIX: &str = "Observation:";

#[allow(clippy::expect_used)]
static BASH_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```bash\s*\n(.*?)\n```").expect("valid bash block regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptItemKind {
    UserInput,
    AssistantOutput,
    AssistantReasoning,
    ToolCall,
    ToolOutput,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptItem {
    pub kind: TranscriptItemKind,
    pub text: String,
}

impl TranscriptItem {
    fn new(kind: TranscriptItemKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// A fenced ```` ```bash ```` block located inside assistant text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BashBlock<'a> {
    /// Byte range of the whole block including fences.
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// Inner command text, not yet trimmed.
    pub(crate) body: &'a str,
}

pub(crate) fn bash_blocks(content: &str) -> Vec<BashBlock<'_>> {
    BASH_BLOCK_RE
        .captures_iter(content)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let body = captures.get(1)?;
            Some(BashBlock {
                start: whole.start(),
                end: whole.end(),
                body: body.as_str(),
            })
        })
        .collect()
}

/// Build the ordered list of display rows for a log snapshot.
pub fn build(log: &[Message]) -> Vec<TranscriptItem> {
    let mut items = Vec::new();
    let mut first_user_seen = false;

    for message in log {
        let text = message.text();
        match &message.role {
            Role::System => {}
            Role::Assistant => items.extend(split_assistant_message(&text)),
            Role::User => {
                let kind = if !first_user_seen {
                    first_user_seen = true;
                    TranscriptItemKind::UserInput
                } else if is_tool_output(&text) {
                    TranscriptItemKind::ToolOutput
                } else {
                    TranscriptItemKind::System
                };
                items.push(TranscriptItem::new(kind, text.trim()));
            }
            Role::Other(_) => items.push(TranscriptItem::new(
                TranscriptItemKind::System,
                text.trim(),
            )),
        }
    }

    items
}

/// Split assistant text around its single bash block.
///
/// Anything other than exactly one block (none, or several) is shown as one
/// `AssistantOutput` row holding the whole message.
pub fn split_assistant_message(content: &str) -> Vec<TranscriptItem> {
    let blocks = bash_blocks(content);
    let [block] = blocks.as_slice() else {
        return vec![TranscriptItem::new(
            TranscriptItemKind::AssistantOutput,
            content.trim(),
        )];
    };

    let prefix = content[..block.start].trim();
    let command = block.body.trim();
    let suffix = content[block.end..].trim();

    let mut items = Vec::with_capacity(3);
    if !prefix.is_empty() {
        let kind = if prefix.contains(REASONING_MARKER) {
            TranscriptItemKind::AssistantReasoning
        } else {
            TranscriptItemKind::AssistantOutput
        };
        items.push(TranscriptItem::new(kind, prefix));
    }
    if !command.is_empty() {
        items.push(TranscriptItem::new(TranscriptItemKind::ToolCall, command));
    }
    if !suffix.is_empty() {
        items.push(TranscriptItem::new(
            TranscriptItemKind::AssistantOutput,
            suffix,
        ));
    }
    items
}

/// Whether a non-task `user` message carries a command observation.
pub fn is_tool_output(text: &str) -> bool {
    let stripped = text.trim_start();
    stripped.starts_with(OBSERVATION_PREFIX)
        || stripped.starts_with(RETURNCODE_OPEN_TAG)
        || (text.contains(OUTPUT_OPEN_TAG) && text.contains(OUTPUT_CLOSE_TAG))
        || (text.contains(WARNING_OPEN_TAG) && text.contains(WARNING_CLOSE_TAG))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use swesh_protocol::ContentPart;
    use swesh_protocol::MessageContent;
    use swesh_protocol::Observation;

    fn kinds(items: &[TranscriptItem]) -> Vec<TranscriptItemKind> {
        items.iter().map(|item| item.kind).collect()
    }

    #[test]
    fn splits_thought_and_bash() {
        let items = split_assistant_message("THOUGHT: x\n\n```bash\necho hi\n```\n");
        assert_eq!(
            kinds(&items),
            vec![
                TranscriptItemKind::AssistantReasoning,
                TranscriptItemKind::ToolCall
            ]
        );
        assert!(items[0].text.starts_with("THOUGHT:"));
        assert_eq!(items[1].text, "echo hi");
    }

    #[test]
    fn prefix_without_marker_is_plain_output_and_suffix_is_kept() {
        let items = split_assistant_message("Let me look.\n```bash\nls -la\n```\nThen decide.");
        assert_eq!(
            items,
            vec![
                TranscriptItem::new(TranscriptItemKind::AssistantOutput, "Let me look."),
                TranscriptItem::new(TranscriptItemKind::ToolCall, "ls -la"),
                TranscriptItem::new(TranscriptItemKind::AssistantOutput, "Then decide."),
            ]
        );
    }

    #[test]
    fn two_blocks_fall_back_to_single_output() {
        let content = "```bash\necho a\n```\n```bash\necho b\n```";
        let items = split_assistant_message(content);
        assert_eq!(
            items,
            vec![TranscriptItem::new(
                TranscriptItemKind::AssistantOutput,
                content
            )]
        );
    }

    #[test]
    fn no_block_falls_back_to_single_output() {
        let items = split_assistant_message("  I am done.  ");
        assert_eq!(
            items,
            vec![TranscriptItem::new(
                TranscriptItemKind::AssistantOutput,
                "I am done."
            )]
        );
    }

    #[test]
    fn fence_tag_is_case_sensitive() {
        let items = split_assistant_message("THOUGHT: x\n```BASH\nls\n```");
        assert_eq!(kinds(&items), vec![TranscriptItemKind::AssistantOutput]);
    }

    #[test]
    fn classifies_observations_and_notices() {
        let log = vec![
            Message::system("sys"),
            Message::user("task here"),
            Message::assistant("THOUGHT: x\n```bash\nls\n```"),
            Message::user("Observation: {'returncode': 0, 'output': 'ok'}"),
            Message::user("LimitsExceeded"),
        ];
        assert_eq!(
            kinds(&build(&log)),
            vec![
                TranscriptItemKind::UserInput,
                TranscriptItemKind::AssistantReasoning,
                TranscriptItemKind::ToolCall,
                TranscriptItemKind::ToolOutput,
                TranscriptItemKind::System,
            ]
        );
    }

    #[test]
    fn rendered_observations_are_tool_output() {
        let log = vec![
            Message::user("task"),
            Message::user(Observation::new(1, "boom").render()),
            Message::user(Observation::new(0, "x".repeat(20_000)).render()),
        ];
        assert_eq!(
            kinds(&build(&log)),
            vec![
                TranscriptItemKind::UserInput,
                TranscriptItemKind::ToolOutput,
                TranscriptItemKind::ToolOutput,
            ]
        );
    }

    #[test]
    fn first_user_message_is_always_the_task() {
        let log = vec![
            Message::user("<returncode>0</returncode>"),
            Message::user("<returncode>0</returncode>"),
        ];
        assert_eq!(
            kinds(&build(&log)),
            vec![
                TranscriptItemKind::UserInput,
                TranscriptItemKind::ToolOutput
            ]
        );
    }

    #[test]
    fn unknown_roles_become_system_and_parts_are_joined() {
        let log = vec![
            Message::user(MessageContent::Parts(vec![
                ContentPart::text("line one"),
                ContentPart::text("line two"),
            ])),
            Message::new("tool", "something"),
        ];
        assert_eq!(
            build(&log),
            vec![
                TranscriptItem::new(TranscriptItemKind::UserInput, "line one\nline two"),
                TranscriptItem::new(TranscriptItemKind::System, "something"),
            ]
        );
    }

    #[test]
    fn build_is_idempotent() {
        let log = vec![
            Message::user("task"),
            Message::assistant("THOUGHT: a\n```bash\npwd\n```"),
            Message::user(Observation::new(0, "/tmp").render()),
        ];
        assert_eq!(build(&log), build(&log));
    }
}
