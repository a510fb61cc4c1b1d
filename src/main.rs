mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use healthdb::config::HealthConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "healthdb", version, about = "Personal health log MCP server for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server on the configured transport
    Serve {
        /// Override the transport: "stdio" or "http"
        #[arg(long)]
        transport: Option<String>,
    },
    /// Print the allowed tables and their columns
    Schema,
    /// Delete rows past their retention window
    Purge,
    /// Check database integrity and print row counts
    Doctor,
    /// Run one tool call with a raw JSON payload
    Call {
        /// check_schema, table_query, table_insert, table_update or table_delete
        tool: String,
        /// Tool arguments, e.g. '{"table": "food_24h"}'
        #[arg(default_value = "{}")]
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HealthConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            if let Some(transport) = transport {
                config.server.transport = transport;
            }
            healthdb::server::serve(config).await?;
        }
        Command::Schema => cli::schema::schema(&config)?,
        Command::Purge => cli::purge::purge(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Call { tool, payload } => cli::call::call(&config, &tool, &payload)?,
    }

    Ok(())
}
