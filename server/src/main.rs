mod config;
mod graphql;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use platform_obs::{ObsConfig, init_tracing, shutdown_tracing};
use platform_store::MemorySessionStore;
use products_deals::{DealRoom, seed_demo};
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "dealroom-server", version, about = "Virtual deal room")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP + GraphQL server.
    Serve(ServeCommand),
    /// Load the demo data into a fresh room and print what was created.
    Seed,
    /// Print the GraphQL schema snapshot.
    #[command(name = "schema:print")]
    SchemaPrint {
        #[arg(long, value_name = "FILE", help = "Destination file path")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Start with an empty room even when DEALROOM_SEED is set")]
    no_seed: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env("dealroom-server"))?;
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Seed => run_seed(),
        Command::SchemaPrint { output } => schema_print(output),
    };
    shutdown_tracing();
    result
}

fn run_seed() -> Result<()> {
    let room = DealRoom::in_memory();
    seed_demo(&room).context("failed to seed demo data")?;
    let summary = serde_json::to_string_pretty(&room.seed_summary())?;
    println!("{summary}");
    Ok(())
}

fn schema_print(path: Option<PathBuf>) -> Result<()> {
    let sdl = graphql::build_schema(DealRoom::in_memory()).sdl();
    match path {
        Some(target) => {
            std::fs::write(&target, sdl)
                .with_context(|| format!("failed to write {}", target.display()))?;
            info!(path = %target.display(), "schema written");
        }
        None => print!("{sdl}"),
    }
    Ok(())
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = Arc::new(AppConfig::load()?);
    let room = DealRoom::in_memory();
    if config.seed_demo && !cmd.no_seed {
        let seeded = seed_demo(&room).context("failed to seed demo data")?;
        info!(users = seeded.users.len(), deals = seeded.deals.len(), "demo room ready");
    }
    let state = AppState {
        schema: graphql::build_schema(room.clone()),
        room,
        sessions: Arc::new(MemorySessionStore::new()),
        config,
    };
    http::serve((&cmd).into(), state).await
}
