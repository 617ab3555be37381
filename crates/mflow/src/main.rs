// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MessengerFlow - a helpdesk inbox for Facebook business pages.
//!
//! This is the binary entry point.

mod agents;
mod commands;
mod serve;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mflow_config::MflowConfig;
use mflow_auth::SessionGate;
use mflow_core::{FlowError, PluginAdapter, Role, StoreAdapter};
use mflow_graph::GraphGateway;
use mflow_storage::store_from_config;
use mflow_sync::{Inbox, InboxSettings};

/// MessengerFlow - a helpdesk inbox for Facebook business pages.
#[derive(Parser, Debug)]
#[command(name = "mflow", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync loop and the webhook endpoint.
    Serve,
    /// Import the pages behind a user access token.
    Connect {
        /// User access token; defaults to `graph.user_access_token`.
        #[arg(long)]
        user_token: Option<String>,
    },
    /// Re-run the full history sync.
    Resync {
        /// Only this page; all connected pages otherwise.
        page: Option<String>,
    },
    /// Re-check every page token and update connection state.
    VerifyPages,
    /// Show dashboard numbers for the logged-in agent.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Send a message as the logged-in agent.
    Send {
        conversation: String,
        text: String,
    },
    /// Start a simulated customer thread on a page.
    Simulate { page: String },
    /// Manage agents and the console session.
    Agent {
        #[command(subcommand)]
        action: AgentCommands,
    },
    /// Manage approved links and media.
    Policy {
        #[command(subcommand)]
        action: PolicyCommands,
    },
}

#[derive(Subcommand, Debug)]
enum AgentCommands {
    /// List agents.
    List,
    /// Register an agent. The password is read from stdin when omitted.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "AGENT")]
        role: Role,
        #[arg(long)]
        password: Option<String>,
    },
    /// Remove an agent.
    Remove { id: String },
    /// Give an agent access to a page.
    Assign { agent_id: String, page_id: String },
    /// Take page access away from an agent.
    Unassign { agent_id: String, page_id: String },
    /// Log in as an agent.
    Login {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// End the console session.
    Logout,
    /// Set a new password for an agent.
    ResetPassword {
        email: String,
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PolicyCommands {
    /// List approved links and media.
    List,
    /// Approve a link.
    AddLink {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Approve a media asset (`image`, `video` or `file`).
    AddMedia {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "image")]
        media_type: String,
    },
    /// Withdraw an approved link or media asset.
    Remove { id: String },
    /// Check a text against the policy without sending it.
    Check { text: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mflow_config::load_and_validate_path(path),
        None => mflow_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level, config.app.log_json);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: MflowConfig) -> Result<(), FlowError> {
    let Some(command) = command else {
        println!("mflow: use --help for available commands");
        return Ok(());
    };

    match command {
        Commands::Serve => serve::run_serve(config).await,
        other => {
            let services = Services::open(&config).await?;
            let result = run_oneshot(other, &services, &config).await;
            services.store.shutdown().await?;
            result
        }
    }
}

async fn run_oneshot(
    command: Commands,
    services: &Services,
    config: &MflowConfig,
) -> Result<(), FlowError> {
    let inbox = services.inbox.as_ref();
    match command {
        Commands::Serve => Err(FlowError::Internal("serve is not a one-shot command".into())),
        Commands::Connect { user_token } => {
            let token = user_token
                .or_else(|| config.graph.user_access_token.clone())
                .ok_or_else(|| {
                    FlowError::InvalidInput(
                        "no user token: pass --user-token or set graph.user_access_token".into(),
                    )
                })?;
            commands::connect(inbox, &token).await
        }
        Commands::Resync { page } => commands::resync(inbox, page.as_deref()).await,
        Commands::VerifyPages => commands::verify_pages(inbox).await,
        Commands::Stats { json } => stats::run_stats(services, json).await,
        Commands::Send { conversation, text } => {
            commands::send(services, &conversation, &text).await
        }
        Commands::Simulate { page } => commands::simulate(inbox, &page).await,
        Commands::Agent { action } => agents::run(services, action).await,
        Commands::Policy { action } => commands::policy(inbox, action).await,
    }
}

/// The inbox and the store it shares with the session gate.
pub(crate) struct Services {
    pub inbox: Arc<Inbox>,
    pub store: Arc<dyn StoreAdapter>,
}

impl Services {
    pub(crate) fn build(config: &MflowConfig) -> Result<Self, FlowError> {
        let store = store_from_config(&config.storage);
        let remote = Arc::new(GraphGateway::new(&config.graph)?);
        let inbox = Arc::new(Inbox::new(
            store.clone(),
            remote,
            InboxSettings::from_config(config),
        ));
        Ok(Self { inbox, store })
    }

    /// Build and load canonical state.
    pub(crate) async fn open(config: &MflowConfig) -> Result<Self, FlowError> {
        let services = Self::build(config)?;
        services.inbox.load().await?;
        Ok(services)
    }

    /// Session gate with the roster and session pointer reloaded.
    pub(crate) async fn gate(&self) -> Result<SessionGate, FlowError> {
        let gate = SessionGate::new(self.store.clone());
        gate.restore().await?;
        Ok(gate)
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mflow={log_level},warn")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
