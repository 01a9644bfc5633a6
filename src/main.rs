// src/main.rs
// Triage - automated intake, classification and routing for customer complaints

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use triage::background::{self, SlaMonitor};
use triage::config::Config;
use triage::db::Database;
use triage::llm::ModelClient;
use triage::notify::{LogNotifier, Notifier, NullNotifier};
use triage::pipeline::Pipeline;
use triage::web;

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Automated triage for customer complaints")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server with the SLA monitor (default)
    Serve {
        /// Port to listen on (overrides TRIAGE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the triage pipeline for a single stored complaint
    Process {
        /// Complaint id
        id: i64,
    },

    /// Run one SLA scan and exit
    SlaCheck,
}

fn open_database(config: &Config) -> Result<Arc<Database>> {
    let db = Database::open(Path::new(&config.db_path))?;
    Ok(Arc::new(db))
}

fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.admin_email {
        Some(email) => {
            info!(admin = %email, "SLA alerts enabled");
            Arc::new(LogNotifier)
        }
        None => Arc::new(NullNotifier),
    }
}

async fn run_server(config: Arc<Config>, port: u16) -> Result<()> {
    let db = open_database(&config)?;

    let model = ModelClient::new(config.llm.clone());
    let pipeline = Pipeline::new(db.clone(), model, config.clone());

    let notifier = build_notifier(&config);
    let shutdown_tx = background::spawn(db.clone(), config.clone(), notifier);

    let state = web::state::AppState::new(db, pipeline);
    let app = web::create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Triage server listening on http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    Ok(())
}

async fn run_process(config: Arc<Config>, id: i64) -> Result<()> {
    let db = open_database(&config)?;
    let model = ModelClient::new(config.llm.clone());
    let pipeline = Pipeline::new(db, model, config);

    match pipeline.process(id).await? {
        Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
        None => println!("complaint {id} not found"),
    }
    Ok(())
}

async fn run_sla_check(config: Arc<Config>) -> Result<()> {
    let db = open_database(&config)?;
    let notifier = build_notifier(&config);

    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let monitor = SlaMonitor::new(db, config, notifier, shutdown_rx);

    let flagged = monitor.check_once(Utc::now()).await?;
    println!("SLA scan complete, {flagged} new violation(s)");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env());

    match cli.command {
        None | Some(Commands::Serve { port: None }) => {
            let port = config.port;
            run_server(config, port).await?;
        }
        Some(Commands::Serve { port: Some(port) }) => {
            run_server(config, port).await?;
        }
        Some(Commands::Process { id }) => {
            run_process(config, id).await?;
        }
        Some(Commands::SlaCheck) => {
            run_sla_check(config).await?;
        }
    }

    Ok(())
}
