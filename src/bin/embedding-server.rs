use std::process;

use chatbot_client::LONG_VERSION;
use chatbot_client::commands::embed::{self, EmbedArgs};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "embedding-server",
    about = "Read {\"texts\": [...]} from stdin and print sentence embeddings as JSON",
    version = LONG_VERSION
)]
struct Cli {
    #[command(flatten)]
    embed: EmbedArgs,
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = embed::run(cli.embed) {
        eprintln!("{err}");
        process::exit(1);
    }
}
