pub mod commands;
pub mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "studyhub")]
#[command(about = "StudyHub API - academic organizer backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "STUDYHUB_CONFIG", help = "YAML config file layered over environment defaults")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Bind address, overrides server.host")]
        host: Option<String>,
        #[arg(long, help = "Port, overrides server.port")]
        port: Option<u16>,
    },

    #[command(about = "Apply bundled SQL migrations to the configured database")]
    Migrate,

    #[command(about = "Print the effective configuration with secrets redacted")]
    Config,

    #[command(about = "Mint a development access token signed with the configured JWT secret")]
    Token {
        #[arg(long, help = "User id for the `sub` claim (random when omitted)")]
        user_id: Option<uuid::Uuid>,
        #[arg(long, help = "Email claim")]
        email: Option<String>,
        #[arg(long, default_value_t = 24, help = "Lifetime in hours")]
        hours: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::install(AppConfig::load(cli.config.as_deref())?);

    match cli.command.unwrap_or(Commands::Serve { host: None, port: None }) {
        Commands::Serve { host, port } => commands::serve::handle(config.clone(), host, port).await,
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Config => commands::config::handle(config, output_format),
        Commands::Token { user_id, email, hours } => {
            commands::token::handle(config, user_id, email, hours, output_format)
        }
    }
}
