//! Commands handed to the execution environment and the results it returns.
//!
//! Observations are written back into the message log as `user` messages in a
//! fixed tagged-block format:
//!
//! ```text
//! <returncode>0</returncode>
//! <output>
//! ...
//! </output>
//! ```
//!
//! Outputs longer than [`MAX_OBSERVATION_CHARS`] are replaced by a `<warning>`
//! block plus the head and tail of the output. The transcript builder relies on
//! these tags to recognise tool output.

use serde::Deserialize;
use serde::Serialize;

pub const RETURNCODE_OPEN_TAG: &str = "<returncode>";
pub const RETURNCODE_CLOSE_TAG: &str = "</returncode>";
pub const OUTPUT_OPEN_TAG: &str = "<output>";
pub const OUTPUT_CLOSE_TAG: &str = "</output>";
pub const WARNING_OPEN_TAG: &str = "<warning>";
pub const WARNING_CLOSE_TAG: &str = "</warning>";

/// Outputs at or above this many characters are elided when rendered.
pub const MAX_OBSERVATION_CHARS: usize = 10_000;
const ELIDED_KEEP_CHARS: usize = MAX_OBSERVATION_CHARS / 2;

const LONG_OUTPUT_WARNING: &str = "The output of your last command was too long.
Please try a different command that produces less output.
If you're looking at a file you can try use head, tail or sed to view a smaller number of lines selectively.
If you're using grep or find and it produced too much output, you can use a more selective search pattern.
If you really need to see something from the full command's output, you can redirect output to a file and then search in that file.";

/// A shell command proposed by the model or typed by the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub command: String,
}

impl Action {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Empty commands are treated as no-ops by the confirmation gate.
    pub fn is_empty(&self) -> bool {
        self.command.trim().is_empty()
    }
}

/// Result of running an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub returncode: i32,
    pub output: String,
}

impl Observation {
    pub fn new(returncode: i32, output: impl Into<String>) -> Self {
        Self {
            returncode,
            output: output.into(),
        }
    }

    /// Render the observation in the tagged-block format stored in the log.
    pub fn render(&self) -> String {
        let mut rendered = format!(
            "{RETURNCODE_OPEN_TAG}{}{RETURNCODE_CLOSE_TAG}\n",
            self.returncode
        );
        let char_count = self.output.chars().count();
        if char_count < MAX_OBSERVATION_CHARS {
            rendered.push_str(OUTPUT_OPEN_TAG);
            rendered.push('\n');
            rendered.push_str(self.output.trim_end_matches('\n'));
            rendered.push('\n');
            rendered.push_str(OUTPUT_CLOSE_TAG);
            return rendered;
        }

        let head: String = self.output.chars().take(ELIDED_KEEP_CHARS).collect();
        let tail: String = self
            .output
            .chars()
            .skip(char_count - ELIDED_KEEP_CHARS)
            .collect();
        let elided = char_count - MAX_OBSERVATION_CHARS;
        rendered.push_str(&format!(
            "{WARNING_OPEN_TAG}\n{LONG_OUTPUT_WARNING}\n{WARNING_CLOSE_TAG}\n\
             <output_head>\n{head}\n</output_head>\n\
             <elided_chars>\n{elided} characters elided\n</elided_chars>\n\
             <output_tail>\n{tail}\n</output_tail>"
        ));
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_output_is_rendered_inside_output_tags() {
        let observation = Observation::new(0, "hello\n");
        assert_eq!(
            observation.render(),
            "<returncode>0</returncode>\n<output>\nhello\n</output>"
        );
    }

    #[test]
    fn long_output_is_elided_with_warning() {
        let output = format!("{}{}", "a".repeat(6_000), "b".repeat(6_000));
        let rendered = Observation::new(2, output).render();

        assert!(rendered.starts_with("<returncode>2</returncode>\n<warning>\n"));
        assert!(rendered.contains("2000 characters elided"));
        assert!(rendered.contains(&format!("<output_head>\n{}\n", "a".repeat(5_000))));
        assert!(rendered.contains(&format!("<output_tail>\n{}\n", "b".repeat(5_000))));
        assert!(!rendered.contains(OUTPUT_OPEN_TAG));
    }

    #[test]
    fn whitespace_only_action_is_empty() {
        assert!(Action::new("  \n").is_empty());
        assert!(!Action::new("ls").is_empty());
    }
}
