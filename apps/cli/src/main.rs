//! MarketLens CLI: news context for Polymarket prediction markets.
//!
//! Finds recent news coverage for an event and summarizes it, with an AI
//! summary when an OpenAI key is configured and a headline digest otherwise.

mod commands;
mod output;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
