// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mflow stats` command implementation.
//!
//! Projects the dashboard for the logged-in agent. `--json` prints the
//! structured form for scripting.

use chrono::Utc;
use mflow_core::FlowError;
use mflow_dashboard::{DashboardStats, project};

use crate::Services;

/// Widest bar of the weekly chart, in characters.
const BAR_WIDTH: usize = 30;

pub async fn run_stats(services: &Services, json: bool) -> Result<(), FlowError> {
    let gate = services.gate().await?;
    let viewer = gate.current_agent().await.ok_or_else(|| {
        FlowError::InvalidInput("no agent is logged in; run `mflow agent login` first".into())
    })?;

    let stats = project(&services.inbox.snapshot().await, &viewer, Utc::now());
    if json {
        let out = serde_json::to_string_pretty(&stats)?;
        println!("{out}");
    } else {
        println!("{}", render(&stats));
    }
    Ok(())
}

fn render(stats: &DashboardStats) -> String {
    let mut out = format!(
        "Open chats:         {}\nResolved:           {}\nAvg response time:  {}\nCSAT:               {}\n",
        stats.open_chats, stats.resolved_today, stats.avg_response_time, stats.csat
    );
    let peak = stats.chart.iter().map(|p| p.count).max().unwrap_or(0).max(1);
    for point in &stats.chart {
        let bar = "#".repeat(point.count * BAR_WIDTH / peak);
        out.push_str(&format!("{}  {:>3} {bar}\n", point.label, point.count));
    }
    out
}
