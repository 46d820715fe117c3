use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use assert_cmd::Command;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use serde_json::{Value, json};

fn chatbot_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("chatbot"));
    cmd.env_remove("CHATBOT_BASE_URL")
        .env_remove("CHATBOT_USER_ID")
        .env_remove("CHATBOT_TIMEOUT")
        .env_remove("CHATBOT_MODEL_DIR")
        .env_remove("CHATBOT_CONFIG")
        .env_remove("CHATBOT_LOG");
    cmd
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("chatbot-test-{label}-{nanos}"))
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    drop(listener);
    format!("http://{addr}")
}

async fn spawn_server() -> String {
    spawn_server_with_health(StatusCode::OK).await
}

async fn chat_reply(Json(body): Json<Value>) -> Response {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Validation failed",
                "details": [{"field": "message", "message": "Message is required"}]
            })),
        )
            .into_response();
    }

    let context_len = body["context"].as_array().map(Vec::len).unwrap_or(0);
    let mut reply = format!("echo: {message} (context {context_len})");
    if let Some(user_id) = body["userId"].as_str() {
        reply.push_str(&format!(" [user {user_id}]"));
    }
    Json(json!({
        "reply": reply,
        "usage": {"prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6},
        "metadata": {"model": "test-model"}
    }))
    .into_response()
}

async fn spawn_server_with_health(health_status: StatusCode) -> String {
    let app = Router::new().route("/api/chat", post(chat_reply)).route(
        "/api/health",
        get(move || async move {
            let status = if health_status == StatusCode::OK {
                "healthy"
            } else {
                "degraded"
            };
            (
                health_status,
                Json(json!({
                    "status": status,
                    "services": {"openai": "connected"},
                    "uptime": 1.5,
                    "version": "1.2.3"
                })),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });
    format!("http://{addr}")
}

#[test]
fn version_prints_build_metadata() {
    chatbot_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("commit:").and(contains("built:")));
}

#[test]
fn subcommand_version_prints_metadata() {
    chatbot_cmd()
        .args(["chat", "--version"])
        .assert()
        .success()
        .stdout(contains("commit:").and(contains("built:")));
}

#[test]
fn help_mentions_completion_command() {
    chatbot_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("completion").and(contains("Generate shell completion script")));
}

#[test]
fn chat_help_includes_examples() {
    chatbot_cmd()
        .args(["chat", "--help"])
        .assert()
        .success()
        .stdout(contains("Examples:").and(contains("--json --show-usage")));
}

#[test]
fn completion_bash_outputs_script() {
    chatbot_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(contains("_chatbot").and(contains("complete")));
}

#[test]
fn completion_fish_outputs_script() {
    chatbot_cmd()
        .args(["completion", "fish"])
        .assert()
        .success()
        .stdout(contains("complete -c chatbot"));
}

#[test]
fn invalid_base_url_returns_explicit_error() {
    chatbot_cmd()
        .args(["chat", "--base-url", "ftp://example.com", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid base URL 'ftp://example.com'"));
}

#[test]
fn invalid_env_timeout_returns_error() {
    chatbot_cmd()
        .env("CHATBOT_TIMEOUT", "soon")
        .args(["chat", "hello"])
        .assert()
        .failure()
        .stderr(contains(
            "Invalid CHATBOT_TIMEOUT 'soon'. Expected a positive number of seconds.",
        ));
}

#[test]
fn chat_against_closed_port_reports_request_failure() {
    chatbot_cmd()
        .args(["chat", "--quiet", "--base-url", &closed_port_url(), "hello"])
        .assert()
        .failure()
        .stdout(is_empty())
        .stderr(contains("Request failed:"));
}

#[test]
fn health_against_closed_port_reports_unavailable() {
    chatbot_cmd()
        .args(["health", "--base-url", &closed_port_url()])
        .assert()
        .failure()
        .stderr(contains("API unavailable at"));
}

#[test]
fn quiet_suppresses_health_warning_but_keeps_fatal_error() {
    chatbot_cmd()
        .args(["health", "--quiet", "--base-url", &closed_port_url()])
        .assert()
        .failure()
        .stderr(contains("API unavailable at").and(contains("Health check failed").not()));
}

#[test]
fn demo_without_server_prints_troubleshooting() {
    chatbot_cmd()
        .args(["demo", "--quiet", "--base-url", &closed_port_url()])
        .assert()
        .failure()
        .stdout(contains("Make sure that:").and(contains("Cannot connect to the API")))
        .stderr(contains("API unavailable at"));
}

#[test]
fn profile_file_missing_returns_explicit_error() {
    let config_path = unique_temp_path("missing-config");
    chatbot_cmd()
        .env("CHATBOT_CONFIG", &config_path)
        .args(["chat", "--profile", "local", "hello"])
        .assert()
        .failure()
        .stderr(contains("Failed to read config file"));
}

#[test]
fn invalid_profile_toml_returns_parse_error() {
    let config_path = unique_temp_path("invalid-toml");
    fs::write(&config_path, "[profiles.bad\nbase_url = \"http://x\"")
        .expect("config should be writable");

    chatbot_cmd()
        .env("CHATBOT_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("Failed to parse config file"));
}

#[test]
fn profile_not_found_returns_error() {
    let config_path = unique_temp_path("profile-not-found");
    fs::write(&config_path, "[profiles.local]\nbase_url = \"http://localhost:3000\"\n")
        .expect("config should be writable");

    chatbot_cmd()
        .env("CHATBOT_CONFIG", &config_path)
        .args(["config", "check", "--profile", "missing"])
        .assert()
        .failure()
        .stderr(contains("Profile 'missing' not found"));
}

#[test]
fn invalid_profile_base_url_returns_error() {
    let config_path = unique_temp_path("invalid-base-url");
    fs::write(&config_path, "[profiles.local]\nbase_url = \"localhost\"\n")
        .expect("config should be writable");

    chatbot_cmd()
        .env("CHATBOT_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("Invalid profile base_url 'localhost'"));
}

#[test]
fn config_check_accepts_valid_file() {
    let config_path = unique_temp_path("valid");
    fs::write(
        &config_path,
        "[profiles.local]\nbase_url = \"http://localhost:3000\"\nuser_id = \"user-1\"\ntimeout = 15\n",
    )
    .expect("config should be writable");

    chatbot_cmd()
        .env("CHATBOT_CONFIG", &config_path)
        .args(["config", "check", "--profile", "local"])
        .assert()
        .success()
        .stdout(contains("config OK:"));
}

#[test]
fn config_show_respects_env_over_profile() {
    let config_path = unique_temp_path("show");
    fs::write(
        &config_path,
        "[profiles.local]\nbase_url = \"http://profile:3000\"\nuser_id = \"profile-user\"\ntimeout = 15\n",
    )
    .expect("config should be writable");

    chatbot_cmd()
        .env("CHATBOT_CONFIG", &config_path)
        .env("CHATBOT_BASE_URL", "http://env:4000")
        .args(["config", "show", "--profile", "local"])
        .assert()
        .success()
        .stdout(
            contains("base_url: http://env:4000")
                .and(contains("user_id: profile-user"))
                .and(contains("timeout: 15s")),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_shot_chat_prints_reply_and_usage() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["chat", "--base-url", &base_url, "--show-usage", "hello"])
        .assert()
        .success()
        .stdout(contains("echo: hello (context 0)"))
        .stderr(contains("total_tokens=6"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_shot_chat_json_prints_full_response() {
    let base_url = spawn_server().await;

    let assert = chatbot_cmd()
        .args(["chat", "--base-url", &base_url, "--json", "hello"])
        .assert()
        .success();

    let body: Value = serde_json::from_slice(&assert.get_output().stdout)
        .expect("stdout should contain valid JSON");
    assert_eq!(body["reply"], json!("echo: hello (context 0)"));
    assert_eq!(body["usage"]["total_tokens"], json!(6));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interactive_session_carries_context_and_clears() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["chat", "--base-url", &base_url])
        .write_stdin("first\nsecond\nclear\nthird\nexit\n")
        .assert()
        .success()
        .stdout(
            contains("Bot: echo: first (context 0)")
                .and(contains("Bot: echo: second (context 2)"))
                .and(contains("Context cleared."))
                .and(contains("Bot: echo: third (context 0)"))
                .and(contains("Goodbye!")),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_prints_status() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["health", "--base-url", &base_url])
        .assert()
        .success()
        .stdout(
            contains("Status: healthy")
                .and(contains("OpenAI: connected"))
                .and(contains("Uptime: 1.50 seconds")),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_single_scenario_runs_against_server() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["demo", "--scenario", "rate-limit", "--base-url", &base_url])
        .assert()
        .success()
        .stdout(
            contains("Request 1: OK - 6 tokens")
                .and(contains("Request 5: OK - 6 tokens"))
                .and(contains("Examples completed!")),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_json_keeps_unmodelled_fields() {
    let base_url = spawn_server().await;

    let assert = chatbot_cmd()
        .args(["health", "--json", "--base-url", &base_url])
        .assert()
        .success();

    let body: Value = serde_json::from_slice(&assert.get_output().stdout)
        .expect("stdout should contain valid JSON");
    assert_eq!(body["version"], json!("1.2.3"));
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_full_tour_runs_every_canned_scenario() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["demo", "--base-url", &base_url])
        .assert()
        .success()
        .stdout(
            contains("=== Simple message ===")
                .and(contains("Bot: echo: What is the capital of France? (context 0)\n"))
                .and(contains("Tokens used: 6"))
                .and(contains("Session ID: session-"))
                .and(contains(
                    "Bot: echo: Give me a short code example (context 4) [user user-demo-123]",
                ))
                .and(contains("History entries kept: 6"))
                .and(contains("Expected error (validation): API Error: Validation failed"))
                .and(contains("Expected error (connection): Request failed"))
                .and(contains("Status: healthy"))
                .and(contains("Request 5: OK - 6 tokens"))
                .and(contains("=".repeat(50)))
                .and(contains("Examples completed!"))
                .and(contains("Try interactive mode?").not())
                .and(contains("=== Interactive mode ===").not()),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_conversation_keeps_configured_user() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args([
            "demo",
            "--scenario",
            "conversation",
            "--user-id",
            "user-42",
            "--base-url",
            &base_url,
        ])
        .assert()
        .success()
        .stdout(
            contains("Bot: echo: What is Rust? (context 0) [user user-42]")
                .and(contains("user-demo-123").not()),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_errors_scenario_reports_both_failures() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["demo", "--scenario", "errors", "--base-url", &base_url])
        .assert()
        .success()
        .stdout(
            contains("=== Error handling ===")
                .and(contains("Expected error (validation): API Error: Validation failed"))
                .and(contains("Expected error (connection): Request failed"))
                .and(contains("=== Simple message ===").not()),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_interactive_flag_runs_loop_after_tour() {
    let base_url = spawn_server().await;

    chatbot_cmd()
        .args(["demo", "--interactive", "--base-url", &base_url])
        .write_stdin("hello\nexit\n")
        .assert()
        .success()
        .stdout(
            contains("=== Interactive mode ===")
                .and(contains("Bot: echo: hello (context 0)"))
                .and(contains("Goodbye!"))
                .and(contains("Examples completed!")),
        );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn demo_precheck_rejects_unhealthy_service() {
    let base_url = spawn_server_with_health(StatusCode::SERVICE_UNAVAILABLE).await;

    chatbot_cmd()
        .args(["demo", "--quiet", "--base-url", &base_url])
        .assert()
        .failure()
        .stdout(
            contains("API not available (HTTP 503 Service Unavailable)")
                .and(contains("Make sure that:"))
                .and(contains("=== Simple message ===").not()),
        )
        .stderr(contains("API unavailable at"));
}

#[test]
fn demo_rejects_invalid_base_url_before_connecting() {
    chatbot_cmd()
        .args(["demo", "--base-url", "ftp://example.com"])
        .assert()
        .failure()
        .stdout(contains("Cannot connect to the API").not())
        .stderr(contains("Invalid base URL 'ftp://example.com'"));
}
