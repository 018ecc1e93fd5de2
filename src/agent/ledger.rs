//! Step ledger of one run and final-answer rendering.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::util::markdown::has_markdown_syntax;

/// Lifecycle of one ledger entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepType {
    #[default]
    Start,
    ToolBatch,
    DelegateBatch,
    End,
}

/// One semantic unit of a run: the start, one tool or delegate batch, or the end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStep {
    pub action: String,
    pub question: String,
    /// Free-text rationale.
    pub think: String,
    pub result: String,
    pub state: StepState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub step_type: StepType,
}

impl RunStep {
    pub fn start(question: impl Into<String>) -> Self {
        Self {
            action: "start".into(),
            question: question.into(),
            state: StepState::Succeeded,
            end_time: Some(Utc::now()),
            step_type: StepType::Start,
            ..Default::default()
        }
    }

    pub fn end(result: impl Into<String>) -> Self {
        Self {
            action: "end".into(),
            result: result.into(),
            state: StepState::Succeeded,
            end_time: Some(Utc::now()),
            step_type: StepType::End,
            ..Default::default()
        }
    }

    /// Parse text as a serialized step.
    ///
    /// Accepts a bare JSON object or one wrapped in a code fence. Returns
    /// `None` unless at least one text field is present.
    pub fn parse(text: &str) -> Option<RunStep> {
        let body = strip_fence(text.trim());
        if !body.starts_with('{') {
            return None;
        }
        let step: RunStep = serde_json::from_str(body).ok()?;
        let recognized = [&step.action, &step.question, &step.think, &step.result]
            .iter()
            .any(|field| !field.is_empty());
        recognized.then_some(step)
    }

    /// Copy the non-empty fields of `other` into this entry.
    pub fn merge(&mut self, other: RunStep) {
        if !other.action.is_empty() {
            self.action = other.action;
        }
        if !other.question.is_empty() {
            self.question = other.question;
        }
        if !other.think.is_empty() {
            self.think = other.think;
        }
        if !other.result.is_empty() {
            self.result = other.result;
        }
        if other.state != StepState::Idle {
            self.state = other.state;
        }
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Append-only step list owned by one run.
#[derive(Debug, Default)]
pub struct Ledger {
    steps: Mutex<Vec<RunStep>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: RunStep) {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<RunStep> {
        self.steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render the final answer; see [`render_answer`].
    pub fn render(&self, debug: bool, claim: Option<&str>) -> String {
        let steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        render_answer(&steps, debug, claim)
    }
}

/// Render the END entry's result, optionally preceded by a markdown trace of
/// the tool and delegate batches and followed by an attribution line.
pub fn render_answer(steps: &[RunStep], debug: bool, claim: Option<&str>) -> String {
    let answer = steps
        .iter()
        .rev()
        .find(|s| s.step_type == StepType::End)
        .map(|s| s.result.trim().to_string())
        .unwrap_or_default();

    let mut out = String::new();
    if debug {
        let batches = steps
            .iter()
            .filter(|s| matches!(s.step_type, StepType::ToolBatch | StepType::DelegateBatch));
        for (idx, step) in batches.enumerate() {
            out.push_str(&format!("### Step {}: {} ({})\n", idx + 1, step.action, step.state));
            if !step.think.trim().is_empty() {
                out.push_str(&format!("> {}\n", step.think.trim()));
            }
            if !step.question.trim().is_empty() {
                out.push_str(&format!("**Input:** {}\n", step.question.trim()));
            }
            out.push_str("**Result:**\n");
            out.push_str(&embed(&step.result));
            out.push_str("\n\n");
        }
        out.push_str("### Final answer\n");
    }
    out.push_str(&answer);
    if let Some(claim) = claim {
        out.push_str("\n\n---\n");
        out.push_str(claim.trim());
    }
    out
}

fn embed(text: &str) -> String {
    let text = text.trim();
    if has_markdown_syntax(text) {
        text.to_string()
    } else {
        format!("```\n{text}\n```")
    }
}
