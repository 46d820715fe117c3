use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Duration;

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Stream};
use reqwest::StatusCode;

use crate::chatbot::{ChatError, ChatbotClient};
use crate::commands::chat::{build_client, interactive_loop};
use crate::commands::health::render;
use crate::commands::{ConnectionArgs, LogArgs};

const PRECHECK_TIMEOUT: Duration = Duration::from_secs(5);
const UNREACHABLE_BASE_URL: &str = "http://localhost:9999";
const DEMO_USER_ID: &str = "user-demo-123";
const RATE_LIMIT_REQUESTS: usize = 5;

const CONVERSATION: [&str; 3] = [
    "What is Rust?",
    "What are its main features?",
    "Give me a short code example",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    Simple,
    Conversation,
    Errors,
    Health,
    RateLimit,
    Interactive,
}

impl Scenario {
    const CANNED: [Scenario; 5] = [
        Scenario::Simple,
        Scenario::Conversation,
        Scenario::Errors,
        Scenario::Health,
        Scenario::RateLimit,
    ];
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Run a single scenario instead of the full tour
    #[arg(long, value_enum)]
    pub scenario: Option<Scenario>,
    /// Start the interactive loop after the canned scenarios without asking
    #[arg(long)]
    pub interactive: bool,
    #[command(flatten)]
    pub connection: ConnectionArgs,
    #[command(flatten)]
    pub log: LogArgs,
}

pub async fn run(args: DemoArgs) -> Result<(), String> {
    args.log.init("warn");
    let client = build_client(&args.connection)?;
    let base_url = client.base_url();

    banner();
    if let Err(reason) = precheck(base_url).await {
        println!("\n{} {reason}", "Error:".if_supports_color(Stream::Stdout, |t| t.red()));
        print_troubleshooting(base_url);
        return Err(format!("API unavailable at {base_url}"));
    }

    let scenarios: Vec<Scenario> = match args.scenario {
        Some(scenario) => vec![scenario],
        None => Scenario::CANNED.to_vec(),
    };

    for (index, scenario) in scenarios.iter().enumerate() {
        if index > 0 {
            println!("\n{}\n", "=".repeat(50));
        }
        match scenario {
            Scenario::Simple => simple(&args.connection).await?,
            Scenario::Conversation => conversation(&args.connection).await?,
            Scenario::Errors => errors(&args.connection).await?,
            Scenario::Health => health(&args.connection).await?,
            Scenario::RateLimit => rate_limit(&args.connection).await?,
            Scenario::Interactive => interactive(&args.connection).await?,
        }
    }

    if args.scenario.is_none() && (args.interactive || ask_for_interactive()) {
        println!();
        interactive(&args.connection).await?;
    }

    println!("\nExamples completed!\n");
    Ok(())
}

fn banner() {
    let title = "Chatbot API client examples";
    println!("{}", title.if_supports_color(Stream::Stdout, |t| t.bold()));
    println!("{}\n", "-".repeat(title.len()));
}

fn heading(text: &str) {
    println!(
        "{}\n",
        format!("=== {text} ===").if_supports_color(Stream::Stdout, |t| t.cyan())
    );
}

async fn precheck(base_url: &str) -> Result<(), String> {
    let response = reqwest::Client::new()
        .get(format!("{base_url}/api/health"))
        .timeout(PRECHECK_TIMEOUT)
        .send()
        .await
        .map_err(|_| "Cannot connect to the API".to_string())?;

    if response.status() == StatusCode::OK {
        Ok(())
    } else {
        Err(format!("API not available (HTTP {})", response.status()))
    }
}

fn print_troubleshooting(base_url: &str) {
    println!("\nMake sure that:");
    println!("1. The server is running at {base_url} (npm start)");
    println!("2. OPENAI_API_KEY is configured on the server");
    println!("3. The server port is reachable from this machine\n");
}

fn ask_for_interactive() -> bool {
    if !io::stdin().is_terminal() {
        return false;
    }
    print!("Try interactive mode? (y/n): ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

async fn simple(connection: &ConnectionArgs) -> Result<(), String> {
    heading("Simple message");
    let client = build_client(connection)?;
    let message = "What is the capital of France?";

    match client.send_stateless(message).await {
        Ok(response) => {
            println!("User: {message}");
            println!("Bot: {}\n", response.reply);
            println!("Tokens used: {}", response.usage.total_tokens);
        }
        Err(err) => println!("Error: {err}"),
    }
    Ok(())
}

async fn conversation(connection: &ConnectionArgs) -> Result<(), String> {
    heading("Conversation with context");
    let mut client = build_client(connection)?;
    if client.user_id().is_none() {
        client.set_user_id(DEMO_USER_ID);
    }
    println!("Session ID: {}\n", client.session_id());

    for message in CONVERSATION {
        println!("User: {message}");
        match client.chat(message).await {
            Ok(response) => {
                println!("Bot: {}\n", response.reply);
                println!("Tokens: {}", response.usage.total_tokens);
                println!("Model: {}", response.metadata.model);
                println!("{}\n", "-".repeat(50));
            }
            Err(err) => println!("Error: {err}\n"),
        }
    }
    println!("History entries kept: {}", client.history().len());
    Ok(())
}

async fn errors(connection: &ConnectionArgs) -> Result<(), String> {
    heading("Error handling");
    let mut client = build_client(connection)?;

    match client.chat("").await {
        Err(err) => println!("Expected error (validation): {err}\n"),
        Ok(_) => println!("Unexpected success for an empty message\n"),
    }

    let mut unreachable = ChatbotClient::new(UNREACHABLE_BASE_URL).map_err(|err| err.to_string())?;
    match unreachable.chat("test").await {
        Err(err) => println!("Expected error (connection): {err}\n"),
        Ok(_) => println!("Unexpected success against {UNREACHABLE_BASE_URL}\n"),
    }
    Ok(())
}

async fn health(connection: &ConnectionArgs) -> Result<(), String> {
    heading("Health check");
    let client = build_client(connection)?;
    match client.health_check().await {
        Some(status) => println!("{}", render(&status)),
        None => println!("API unavailable\n"),
    }
    Ok(())
}

async fn rate_limit(connection: &ConnectionArgs) -> Result<(), String> {
    heading("Repeated requests");
    let mut client = build_client(connection)?;
    println!("Sending {RATE_LIMIT_REQUESTS} requests...\n");

    for index in 1..=RATE_LIMIT_REQUESTS {
        match client.chat(&format!("Test message {index}")).await {
            Ok(response) => {
                print!(
                    "Request {index}: OK - {} tokens",
                    response.usage.total_tokens
                );
                match response.rate_limit {
                    Some(limit) => println!(
                        " (remaining {}/{}{})",
                        display_or_dash(limit.remaining),
                        display_or_dash(limit.limit),
                        limit
                            .reset
                            .map(|secs| format!(", resets in {secs}s"))
                            .unwrap_or_default()
                    ),
                    None => println!(),
                }
            }
            Err(err) => {
                println!("Request {index}: Error - {err}");
                if let ChatError::Api {
                    retry_after: Some(secs),
                    ..
                } = err
                {
                    println!("  Retry after: {secs} seconds");
                }
            }
        }
    }
    println!();
    Ok(())
}

async fn interactive(connection: &ConnectionArgs) -> Result<(), String> {
    heading("Interactive mode");
    let mut client = build_client(connection)?;
    let stdin = io::stdin();
    interactive_loop(&mut client, stdin.lock(), io::stdout())
        .await
        .map_err(|err| format!("Failed to run interactive session: {err}"))
}

fn display_or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
