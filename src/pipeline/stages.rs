//! Agent stage definitions, input rendering, and direction selection

use serde_json::{json, Value};

/// One agent call within the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Context,
    Research,
    Prompt,
}

impl Stage {
    /// File stem of this stage's system prompt under the prompts directory
    pub fn prompt_name(self) -> &'static str {
        match self {
            Stage::Context => "context_agent",
            Stage::Research => "research_agent",
            Stage::Prompt => "prompt_agent",
        }
    }

    /// Key this stage's output is stored under in the run result
    pub fn result_key(self) -> &'static str {
        match self {
            Stage::Context => "context",
            Stage::Research => "research",
            Stage::Prompt => "prompts",
        }
    }

    /// 1-indexed position, for progress banners
    pub fn number(self) -> usize {
        match self {
            Stage::Context => 1,
            Stage::Research => 2,
            Stage::Prompt => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Context => "Context Agent",
            Stage::Research => "Research Agent",
            Stage::Prompt => "Prompt Agent",
        }
    }
}

/// Walk a nested path through a JSON value
fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(key))
}

/// String field with a default when missing or the stage degraded
pub fn text_field(value: &Value, path: &[&str], default: &str) -> String {
    lookup(value, path)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// String-array field joined with ", "; empty string when missing
pub fn list_field(value: &Value, path: &[&str]) -> String {
    lookup(value, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Input for the context stage: a short instruction embedding the raw brief
pub fn render_context_input(brief: &str) -> String {
    format!("Get context for: {}", brief)
}

/// Input for the research stage, interpolating every context field
///
/// Each lookup carries a default so a degraded `{raw, error}` context still
/// renders.
pub fn render_research_input(context: &Value) -> String {
    format!(
        "Brand: {}\n\
         Colors: {}\n\
         Mood: {}\n\
         Avoid: {}\n\
         Style: {}\n\
         Product: {}\n\
         Target Audience: {}\n\
         Additional: {}\n",
        text_field(context, &["brand", "name"], "Unknown"),
        list_field(context, &["brand", "colors"]),
        text_field(context, &["brand", "mood"], "N/A"),
        list_field(context, &["brand", "avoid"]),
        text_field(context, &["preferences", "style"], "N/A"),
        text_field(context, &["product", "name"], "Unknown"),
        text_field(context, &["product", "target_audience"], "N/A"),
        text_field(context, &["additional_notes"], ""),
    )
}

/// Input for the prompt stage, interpolating context and the selected direction
///
/// The trailing "3 prompt variations" line is an instruction to the model,
/// not a postcondition the pipeline enforces.
pub fn render_prompt_input(context: &Value, direction: &Value) -> String {
    format!(
        "Brand Context:\n\
         - Name: {}\n\
         - Colors: {}\n\
         - Mood: {}\n\
         - Avoid: {}\n\
         - Style: {}\n\
         \n\
         Selected Direction: {}\n\
         Description: {}\n\
         \n\
         Generate 3 prompt variations for this direction.\n",
        text_field(context, &["brand", "name"], "Unknown"),
        list_field(context, &["brand", "colors"]),
        text_field(context, &["brand", "mood"], "N/A"),
        list_field(context, &["brand", "avoid"]),
        text_field(context, &["preferences", "style"], "N/A"),
        text_field(direction, &["name"], "N/A"),
        text_field(direction, &["description"], "N/A"),
    )
}

/// Pick a creative direction from the research output
///
/// Out-of-range indices clamp to the last available direction. When the
/// research stage produced no directions at all, a single default direction
/// built from the brief is substituted so the pipeline can continue.
pub fn select_direction(research: &Value, requested: usize, brief: &str) -> Value {
    let directions = research
        .get("suggested_directions")
        .and_then(Value::as_array);

    match directions {
        Some(list) if !list.is_empty() => list[requested.min(list.len() - 1)].clone(),
        _ => json!({"name": "Default", "description": brief}),
    }
}
