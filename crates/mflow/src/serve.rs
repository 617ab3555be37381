// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mflow serve` command implementation.
//!
//! Loads the inbox, runs an initial full sync, keeps one poller per open
//! conversation and serves the HTTP endpoint until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use mflow_auth::SessionGate;
use mflow_config::MflowConfig;
use mflow_core::{FlowError, PluginAdapter};
use mflow_gateway::{GatewayState, ServerConfig, WebhookAuth, start_server};
use mflow_sync::shutdown::{drain_pollers, install_signal_handler};
use mflow_sync::{Inbox, Pollers};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Services;

/// Time given to running polls to finish on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the `mflow serve` command.
pub async fn run_serve(config: MflowConfig) -> Result<(), FlowError> {
    info!(name = %config.app.name, "starting mflow serve");

    let services = Services::build(&config)?;
    let inbox = services.inbox.clone();

    // A failed load still serves /health so the failure is observable.
    let init_error = match inbox.load().await {
        Ok(()) => None,
        Err(e) => {
            error!(error = %e, "inbox failed to load");
            Some(e.to_string())
        }
    };

    if init_error.is_none() {
        restore_session(&services).await;
    }

    let cancel = install_signal_handler();

    let mut state = GatewayState::new(inbox.clone(), WebhookAuth::from_config(&config.webhook));
    if let Some(err) = &init_error {
        state = state.with_init_error(err.clone());
    }
    let server_config = ServerConfig::from_config(&config.webhook);
    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(&server_config, state, server_cancel.clone()).await {
            error!(error = %e, "HTTP endpoint failed");
            server_cancel.cancel();
        }
    });

    if init_error.is_none() {
        let report = inbox.sync_all().await;
        info!(
            pages = report.pages,
            conversations = report.conversations,
            inserted = report.ingest.inserted,
            failed = report.failed,
            "initial sync finished"
        );

        let interval = Duration::from_secs(config.sync.poll_interval_secs);
        run_pollers(inbox, interval, cancel.clone()).await;
    } else {
        cancel.cancelled().await;
    }

    if let Err(e) = server.await {
        warn!(error = %e, "HTTP endpoint task ended abnormally");
    }

    if let Err(e) = services.store.shutdown().await {
        warn!(error = %e, "store shutdown failed");
    }

    info!("mflow serve shutdown complete");
    Ok(())
}

async fn restore_session(services: &Services) {
    let gate = SessionGate::new(services.store.clone());
    match gate.restore().await {
        Ok(Some(agent)) => {
            let visible = gate.visible_pages(&services.inbox.pages().await).await;
            info!(agent_id = %agent.id, pages = visible.len(), "console session restored");
        }
        Ok(None) => debug!("no console session"),
        Err(e) => warn!(error = %e, "console session could not be restored"),
    }
}

/// Keep the poller set in line with the open conversations until `cancel` fires.
async fn run_pollers(inbox: Arc<Inbox>, interval: Duration, cancel: CancellationToken) {
    let mut pollers = Pollers::new(inbox, interval, cancel.clone());
    pollers.reconcile().await;
    info!(count = pollers.len(), interval_secs = interval.as_secs(), "pollers started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                pollers.reconcile().await;
                debug!(count = pollers.len(), "pollers reconciled");
            }
        }
    }

    drain_pollers(&mut pollers, DRAIN_TIMEOUT).await;
}
