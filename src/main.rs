// SPDX-License-Identifier: MIT
//! The `agentx` composition root (spec §6.3): parses arguments, initializes
//! tracing exactly once, then either serves the gateway or runs the `chat`
//! client. Contains no business logic of its own, grounded in the teacher's
//! `src/main.rs` parse-then-dispatch shape.
mod chat;
mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use agentx_driver::ScriptedDriver;
use agentx_image::InMemoryRepository;
use agentx_runtime::{Container, DriverFactory, ErrorManager, SessionManager};
use agentx_types::ContainerId;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Some(Commands::Chat { definition }) => match run_chat(&cli, definition).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err:?}");
                ExitCode::FAILURE
            }
        },
        None => run_server(&cli).await,
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_chat(cli: &Cli, definition: &str) -> anyhow::Result<()> {
    let port = cli.port.unwrap_or(agentx_gateway::GatewayConfig::default().port);
    let (http_base, ws_url) = match &cli.server {
        Some(server) => (to_http_base(server), to_ws_url(server)),
        None => (
            format!("http://127.0.0.1:{port}"),
            format!("ws://127.0.0.1:{port}/ws"),
        ),
    };
    chat::run(&http_base, &ws_url, definition, &cli.theme).await
}

fn to_http_base(server: &str) -> String {
    server
        .replacen("wss://", "https://", 1)
        .replacen("ws://", "http://", 1)
        .trim_end_matches("/ws")
        .to_string()
}

fn to_ws_url(server: &str) -> String {
    if server.starts_with("ws://") || server.starts_with("wss://") {
        server.to_string()
    } else {
        format!("{}/ws", server.replacen("https://", "wss://", 1).replacen("http://", "ws://", 1))
    }
}

/// Spec §6.3 exit codes: 0 success, 1 config error (missing LLM provider key).
async fn run_server(cli: &Cli) -> ExitCode {
    let mut config = agentx_gateway::GatewayConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }

    if config.llm_provider_key.is_none() {
        eprintln!("error: LLM_PROVIDER_KEY is not set");
        return ExitCode::FAILURE;
    }

    let repository: Arc<dyn agentx_image::Repository> = Arc::new(InMemoryRepository::new());
    let driver_factory: DriverFactory = Arc::new(|| Arc::new(ScriptedDriver::new(vec![vec![]])));
    let container = Arc::new(Container::new(ContainerId::new(), repository.clone(), driver_factory));
    let session_manager = Arc::new(SessionManager::new(repository.clone(), container.clone()));
    let error_manager = Arc::new(ErrorManager::new());
    error_manager.register_handler(|event| {
        tracing::warn!(agent_id = %event.agent_id, code = event.error.code, "unhandled agent error");
    });

    let state = agentx_gateway::GatewayState::new(repository, container, session_manager, error_manager);

    match agentx_gateway::serve(&config, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        }
    }
}
