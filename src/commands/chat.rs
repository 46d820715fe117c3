use std::io::{self, BufRead, Write};

use clap::Args;

use crate::chatbot::{ChatResponse, ChatbotClient};
use crate::commands::{ConnectionArgs, LogArgs};

#[derive(Debug, Args, Clone)]
pub struct ChatArgs {
    /// Message to send. Omit it to start an interactive session
    pub message: Option<String>,
    #[command(flatten)]
    pub connection: ConnectionArgs,
    /// Print the full JSON response instead of the reply text
    #[arg(long)]
    pub json: bool,
    /// Print token usage to stderr
    #[arg(long)]
    pub show_usage: bool,
    #[command(flatten)]
    pub log: LogArgs,
}

pub async fn run(args: ChatArgs) -> Result<(), String> {
    args.log.init("warn");
    let mut client = build_client(&args.connection)?;

    let Some(message) = args.message else {
        let stdin = io::stdin();
        return interactive_loop(&mut client, stdin.lock(), io::stdout())
            .await
            .map_err(|err| format!("Failed to run interactive session: {err}"));
    };

    let response = client.chat(&message).await.map_err(|err| err.to_string())?;
    if args.json {
        let body = serde_json::to_string_pretty(&response)
            .map_err(|err| format!("Failed to encode response: {err}"))?;
        println!("{body}");
    } else {
        println!("{}", response.reply);
    }
    if args.show_usage && !args.log.quiet {
        eprintln!("{}", usage_line(&response));
    }
    Ok(())
}

pub fn build_client(connection: &ConnectionArgs) -> Result<ChatbotClient, String> {
    let settings = connection.resolve()?;
    let mut client = ChatbotClient::with_options(&settings.base_url, settings.options)
        .map_err(|err| err.to_string())?;
    if let Some(user_id) = settings.user_id {
        client.set_user_id(user_id);
    }
    Ok(client)
}

pub fn usage_line(response: &ChatResponse) -> String {
    format!(
        "usage: prompt_tokens={} completion_tokens={} total_tokens={} model={}",
        response.usage.prompt_tokens,
        response.usage.completion_tokens,
        response.usage.total_tokens,
        if response.metadata.model.is_empty() {
            "unknown"
        } else {
            response.metadata.model.as_str()
        }
    )
}

/// Reads lines from `input` until `exit` or EOF, sending each one as a chat
/// turn. `clear` resets the history; blank lines are skipped. Chat errors are
/// reported inline and do not end the session.
pub async fn interactive_loop<R: BufRead, W: Write>(
    client: &mut ChatbotClient,
    mut input: R,
    mut output: W,
) -> io::Result<()> {
    writeln!(
        output,
        "Type 'exit' to quit, 'clear' to reset the conversation.\n"
    )?;

    let mut line = String::new();
    loop {
        write!(output, "You: ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output, "\nGoodbye!")?;
            return Ok(());
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") {
            writeln!(output, "\nGoodbye!")?;
            return Ok(());
        }
        if message.eq_ignore_ascii_case("clear") {
            client.clear_history();
            writeln!(output, "Context cleared.\n")?;
            continue;
        }

        match client.chat(message).await {
            Ok(response) => writeln!(output, "Bot: {}\n", response.reply)?,
            Err(err) => writeln!(output, "Error: {err}\n")?,
        }
    }
}
