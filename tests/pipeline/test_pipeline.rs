//! Orchestrator tests over a mock completion service

use super::common::*;
use content_pipeline::completion::CompletionClient;
use content_pipeline::{save_results, Pipeline, PipelineConfig, RunResult};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BRIEF: &str = "client: beats, product: wireless earbuds, campaign: summer fitness";

fn test_pipeline(server: &MockServer, prompts_dir: &Path) -> Pipeline {
    let config = PipelineConfig {
        model: "gpt-4o".to_string(),
        prompts_dir: prompts_dir.to_path_buf(),
        output_dir: prompts_dir.join("output"),
        verbose: false,
    };
    let client = CompletionClient::with_base_url("test-key".to_string(), server.uri());
    Pipeline::new(client, config)
}

#[tokio::test]
async fn test_full_run_produces_all_stages() {
    let server = MockServer::start().await;
    mount_stage(&server, "Get context for:", &sample_context_json()).await;
    mount_stage(&server, "Target Audience:", &sample_research_json()).await;
    mount_stage(&server, "Selected Direction:", &sample_prompts_json()).await;

    let dir = tempfile::tempdir().unwrap();
    write_stage_prompts(dir.path());

    let results = test_pipeline(&server, dir.path())
        .run(BRIEF, 0)
        .await
        .unwrap();

    assert_eq!(results.context["brand"]["name"], "Beats");
    let directions = results.research["suggested_directions"].as_array().unwrap();
    assert!(!directions.is_empty());
    assert_eq!(results.prompts["prompts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_fenced_stage_response_parses() {
    let server = MockServer::start().await;
    let fenced = format!("```json\n{}\n```", sample_context_json());
    mount_stage(&server, "Get context for:", &fenced).await;
    mount_stage(&server, "Target Audience:", &sample_research_json()).await;
    mount_stage(&server, "Selected Direction:", &sample_prompts_json()).await;

    let dir = tempfile::tempdir().unwrap();
    write_stage_prompts(dir.path());

    let results = test_pipeline(&server, dir.path())
        .run(BRIEF, 0)
        .await
        .unwrap();

    assert_eq!(results.context["brand"]["name"], "Beats");
}

#[tokio::test]
async fn test_degraded_context_still_completes() {
    let server = MockServer::start().await;
    // Context stage replies with prose; later stages render with defaults
    mount_stage(&server, "Get context for:", "Sorry, I cannot help with that.").await;
    mount_stage(&server, "Target Audience:", &sample_research_json()).await;
    mount_stage(&server, "Selected Direction:", &sample_prompts_json()).await;

    let dir = tempfile::tempdir().unwrap();
    write_stage_prompts(dir.path());

    let results = test_pipeline(&server, dir.path())
        .run(BRIEF, 0)
        .await
        .unwrap();

    let context = results.context.as_object().unwrap();
    assert_eq!(context.len(), 2);
    assert_eq!(context["raw"], "Sorry, I cannot help with that.");
    assert!(context["error"].as_str().is_some());
    assert_eq!(results.prompts["prompts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_completion_error_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    write_stage_prompts(dir.path());

    let result = test_pipeline(&server, dir.path()).run(BRIEF, 0).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_prompt_file_is_an_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    // No stage prompts written

    let err = test_pipeline(&server, dir.path())
        .run(BRIEF, 0)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("prompt file not found"));
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let results = RunResult {
        context: serde_json::from_str(&sample_context_json()).unwrap(),
        research: serde_json::from_str(&sample_research_json()).unwrap(),
        prompts: serde_json::from_str(&sample_prompts_json()).unwrap(),
    };

    let dir = tempfile::tempdir().unwrap();
    let snapshot = save_results(&results, dir.path()).await.unwrap();
    assert_eq!(snapshot.file_name().unwrap(), "pipeline_output.json");

    let reparsed: RunResult =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert_eq!(reparsed, results);
}
