//! Jinja-style rendering for the prompt templates in `config.toml`.
//!
//! Templates are user-editable strings, so they are parsed at runtime with
//! `minijinja` rather than compiled in. Undefined variables render as empty
//! text, as in Jinja.

use std::collections::BTreeMap;

use minijinja::Environment;
use tracing::warn;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::error::SweshErr;

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env
}

/// Render `template` with `vars`. A template that fails to render is logged
/// and returned verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let context: BTreeMap<&str, &str> = vars.iter().copied().collect();
    environment()
        .render_str(template, context)
        .unwrap_or_else(|err| {
            warn!("failed to render prompt template: {err}");
            template.to_string()
        })
}

/// Parse every configured template so syntax errors surface before the
/// session starts.
pub fn validate(config: &AgentConfig) -> Result<()> {
    let env = environment();
    for (name, source) in [
        ("system_template", &config.system_template),
        ("instance_template", &config.instance_template),
        ("format_error_template", &config.format_error_template),
        ("timeout_template", &config.timeout_template),
    ] {
        env.template_from_str(source)
            .map_err(|source| SweshErr::Template { name, source })?;
    }
    Ok(())
}
