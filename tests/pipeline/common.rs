//! Common fixtures for pipeline integration tests

use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Write minimal system prompts for all three stages into a directory
pub fn write_stage_prompts(dir: &Path) {
    for name in ["context_agent", "research_agent", "prompt_agent"] {
        std::fs::write(
            dir.join(format!("{}.md", name)),
            format!("You are the {}. Respond with a JSON object only.", name),
        )
        .unwrap();
    }
}

/// Chat completion payload wrapping the given message content
pub fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// Mount a stage responder matched by a marker substring of the user input
///
/// Markers used by tests are unique per stage: "Get context for:" (context),
/// "Target Audience:" (research), "Selected Direction:" (prompt).
pub async fn mount_stage(server: &MockServer, marker: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(content)))
        .mount(server)
        .await;
}

pub fn sample_context_json() -> String {
    json!({
        "brand": {
            "name": "Beats",
            "colors": ["red", "black"],
            "mood": "energetic",
            "avoid": ["clutter"]
        },
        "product": {
            "name": "wireless earbuds",
            "target_audience": "runners"
        },
        "preferences": {"style": "minimal"},
        "additional_notes": "summer fitness campaign"
    })
    .to_string()
}

pub fn sample_research_json() -> String {
    json!({
        "suggested_directions": [
            {"name": "Sunrise Run", "description": "dawn jogging scenes", "confidence": 0.9},
            {"name": "Beach Sprint", "description": "coastal sprint energy", "confidence": 0.7}
        ]
    })
    .to_string()
}

pub fn sample_prompts_json() -> String {
    json!({
        "prompts": [
            {
                "id": "sunrise_wide",
                "main_prompt": "runner at dawn wearing red earbuds, wide shot",
                "negative_prompt": "clutter",
                "model": "flux-pro",
                "technical": {"aspect_ratio": "16:9"}
            },
            {
                "id": "sunrise_close",
                "main_prompt": "close-up of earbuds catching first light",
                "negative_prompt": "clutter",
                "model": "sd-xl",
                "aspect_ratio": "1:1"
            },
            {
                "id": "sunrise_motion",
                "main_prompt": "motion blur sprint along a red-lit track",
                "model": "flux-pro",
                "technical": {"aspect_ratio": "21:9"}
            }
        ]
    })
    .to_string()
}
