use std::io;
use std::process;

use chatbot_client::LONG_VERSION;
use chatbot_client::commands::chat::{self, ChatArgs};
use chatbot_client::commands::config::{self, ConfigArgs};
use chatbot_client::commands::demo::{self, DemoArgs};
use chatbot_client::commands::embed::{self, EmbedArgs};
use chatbot_client::commands::health::{self, HealthArgs};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  chatbot chat \"What is the capital of France?\"\n  chatbot chat --base-url http://localhost:3000 --user-id user-123\n  chatbot health --json\n  chatbot demo --scenario conversation\n  echo '{\"texts\": [\"hello\"]}' | chatbot embed --model-dir ./models/all-MiniLM-L6-v2\n  chatbot completion bash > ~/.local/share/bash-completion/completions/chatbot";

const CHAT_HELP_EXAMPLES: &str = "Examples:\n  chatbot chat \"What is the capital of France?\"\n  chatbot chat --json --show-usage \"Explain ownership\"\n  chatbot chat    # interactive session, 'exit' to quit, 'clear' to reset";

const EMBED_HELP_EXAMPLES: &str = "Examples:\n  echo '{\"texts\": [\"hello\", \"world\"]}' | chatbot embed\n  chatbot embed --model-dir ./models/all-MiniLM-L6-v2 < request.json";

#[derive(Debug, Parser)]
#[command(
    name = "chatbot",
    about = "Client tools for the chatbot API",
    version = LONG_VERSION,
    propagate_version = true,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Send a message or start an interactive session", after_help = CHAT_HELP_EXAMPLES)]
    Chat(ChatArgs),
    #[command(about = "Probe the API health endpoint")]
    Health(HealthArgs),
    #[command(about = "Run the canned client usage scenarios")]
    Demo(DemoArgs),
    #[command(about = "Embed a JSON text list read from stdin", after_help = EMBED_HELP_EXAMPLES)]
    Embed(EmbedArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "chatbot", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "chatbot", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "chatbot", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat(args) => chat::run(args).await,
        Commands::Health(args) => health::run(args).await,
        Commands::Demo(args) => demo::run(args).await,
        Commands::Embed(args) => embed::run(args),
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
