//! System prompt templating.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::options::RunOptions;
use crate::session::Session;

static SESSION_SLOT: OnceLock<Option<Regex>> = OnceLock::new();

/// Substitute the prompt placeholders.
///
/// `{{context}}`, `{{tools}}`, `{{agents}}` and `{{session}}` become JSON;
/// `{{session.KEY}}` becomes one slot (strings unquoted, missing slots empty).
/// Called on every iteration so session writes from tools are visible.
pub fn render_system_prompt(template: &str, options: &RunOptions, session: &Session) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    let mut text = template.to_string();
    if text.contains("{{context}}") {
        text = text.replace("{{context}}", &json_text(options.context()));
    }
    if text.contains("{{tools}}") {
        text = text.replace("{{tools}}", &to_json(options.tools()));
    }
    if text.contains("{{agents}}") {
        text = text.replace("{{agents}}", &to_json(options.agents()));
    }
    if text.contains("{{session}}") {
        text = text.replace("{{session}}", &to_json(&session.snapshot()));
    }
    let Some(slot) = SESSION_SLOT
        .get_or_init(|| Regex::new(r"\{\{\s*session\.([A-Za-z0-9_.\-]+)\s*\}\}").ok())
        .as_ref()
    else {
        return text;
    };
    slot.replace_all(&text, |caps: &Captures<'_>| {
        session
            .get(&caps[1])
            .map(|value| json_text(&value))
            .unwrap_or_default()
    })
    .into_owned()
}

fn json_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
