use clap::Args;

use crate::chatbot::HealthStatus;
use crate::commands::chat::build_client;
use crate::commands::{ConnectionArgs, LogArgs};

#[derive(Debug, Args, Clone)]
pub struct HealthArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Print the raw health body as JSON
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub log: LogArgs,
}

pub async fn run(args: HealthArgs) -> Result<(), String> {
    args.log.init("warn");
    let client = build_client(&args.connection)?;

    let body = client
        .health_check_raw()
        .await
        .ok_or_else(|| format!("API unavailable at {}", client.base_url()))?;

    if args.json {
        let body = serde_json::to_string_pretty(&body)
            .map_err(|err| format!("Failed to encode health status: {err}"))?;
        println!("{body}");
        return Ok(());
    }

    let health: HealthStatus = serde_json::from_value(body).map_err(|err| {
        format!(
            "Unexpected health response from {}: {err}",
            client.base_url()
        )
    })?;
    print!("{}", render(&health));
    Ok(())
}

pub fn render(health: &HealthStatus) -> String {
    let mut out = format!("Status: {}\n", health.status);
    out.push_str(&format!(
        "OpenAI: {}\n",
        health.services.openai.as_deref().unwrap_or("unknown")
    ));
    out.push_str(&format!("Uptime: {:.2} seconds\n", health.uptime));
    if let Some(timestamp) = &health.timestamp {
        out.push_str(&format!("Timestamp: {timestamp}\n"));
    }
    if let Some(response_time) = &health.response_time {
        out.push_str(&format!("Response time: {response_time}\n"));
    }
    out
}
