mod cli;
mod client;
mod config;
mod dto;
mod gemini;
mod server;
mod subtitle;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::config::ClientConfig;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { host, port } => server::run_server(host, port).await?,
        Commands::TranscribeFile {
            media_file,
            server_url,
            language,
        } => client::run_client(ClientConfig::new(server_url, media_file, language)).await?,
    }

    Ok(())
}
