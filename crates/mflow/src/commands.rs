// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot inbox commands: connect, resync, verify-pages, send, simulate, policy.

use mflow_core::{ApprovedLink, ApprovedMedia, FlowError, MediaType};
use mflow_sync::{ContentPolicy, Inbox, SyncReport};
use uuid::Uuid;

use crate::{PolicyCommands, Services};

pub async fn connect(inbox: &Inbox, user_token: &str) -> Result<(), FlowError> {
    let pages = inbox.connect_pages(user_token).await?;
    if pages.is_empty() {
        println!("No pages found for this token.");
        return Ok(());
    }
    for page in &pages {
        println!("connected  {}  {} ({})", page.id, page.name, page.category);
    }
    let report = inbox.sync_all().await;
    print_sync_report(&report);
    Ok(())
}

pub async fn resync(inbox: &Inbox, page_id: Option<&str>) -> Result<(), FlowError> {
    let report = match page_id {
        Some(id) => inbox.sync_full(id).await?,
        None => inbox.sync_all().await,
    };
    print_sync_report(&report);
    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    println!(
        "synced {} page(s), {} conversation(s): {} new, {} duplicate, {} superseded, {} failed",
        report.pages,
        report.conversations,
        report.ingest.inserted,
        report.ingest.duplicates,
        report.ingest.superseded,
        report.failed
    );
}

pub async fn verify_pages(inbox: &Inbox) -> Result<(), FlowError> {
    for page in inbox.pages().await {
        let line = match inbox.verify_page(&page.id).await {
            Ok(true) => "connected".to_string(),
            Ok(false) => "disconnected".to_string(),
            Err(e) => format!("unknown ({e})"),
        };
        println!("{:<24} {:<32} {line}", page.id, page.name);
    }
    Ok(())
}

/// Send as the logged-in agent, subject to the content policy.
pub async fn send(services: &Services, conversation_id: &str, text: &str) -> Result<(), FlowError> {
    let gate = services.gate().await?;
    let agent = gate.current_agent().await.ok_or_else(|| {
        FlowError::InvalidInput("no agent is logged in; run `mflow agent login` first".into())
    })?;

    let conversation = services
        .inbox
        .conversation(conversation_id)
        .await
        .ok_or_else(|| FlowError::not_found("conversation", conversation_id))?;
    let page = services
        .inbox
        .pages()
        .await
        .into_iter()
        .find(|p| p.id == conversation.page_id)
        .ok_or_else(|| FlowError::not_found("page", &conversation.page_id))?;
    if !gate.can_view(&page).await {
        return Err(FlowError::InvalidInput(format!(
            "agent {} is not assigned to page {}",
            agent.id, page.id
        )));
    }

    let message = services.inbox.send_outbound(conversation_id, text, &agent).await?;
    if message.is_optimistic() {
        println!("queued locally as {}", message.id);
    } else {
        println!("sent as {}", message.id);
    }
    Ok(())
}

pub async fn simulate(inbox: &Inbox, page_id: &str) -> Result<(), FlowError> {
    let conversation = inbox.simulate_inbound(page_id).await?;
    println!(
        "{}  {}: {}",
        conversation.id, conversation.customer_name, conversation.last_message
    );
    Ok(())
}

pub async fn policy(inbox: &Inbox, action: PolicyCommands) -> Result<(), FlowError> {
    match action {
        PolicyCommands::List => {
            for link in inbox.links().await {
                println!("link   {}  {}  {}", link.id, link.title, link.url);
            }
            for media in inbox.media().await {
                println!("{:<6} {}  {}  {}", media.media_type, media.id, media.title, media.url);
            }
            Ok(())
        }
        PolicyCommands::AddLink {
            title,
            url,
            category,
        } => {
            let link = ApprovedLink {
                id: format!("link-{}", Uuid::new_v4()),
                title,
                url: require_url(url)?,
                category,
            };
            println!("approved {}", link.id);
            let mut links = inbox.links().await;
            links.push(link);
            inbox.set_approved_links(links).await
        }
        PolicyCommands::AddMedia {
            title,
            url,
            media_type,
        } => {
            let media_type: MediaType = media_type.parse().map_err(|_| {
                FlowError::InvalidInput(format!(
                    "unknown media type '{media_type}', expected image, video or file"
                ))
            })?;
            let asset = ApprovedMedia {
                id: format!("media-{}", Uuid::new_v4()),
                title,
                url: require_url(url)?,
                media_type,
            };
            println!("approved {}", asset.id);
            let mut media = inbox.media().await;
            media.push(asset);
            inbox.set_approved_media(media).await
        }
        PolicyCommands::Remove { id } => {
            let links = inbox.links().await;
            let media = inbox.media().await;
            if links.iter().any(|l| l.id == id) {
                inbox
                    .set_approved_links(links.into_iter().filter(|l| l.id != id).collect())
                    .await
            } else if media.iter().any(|m| m.id == id) {
                inbox
                    .set_approved_media(media.into_iter().filter(|m| m.id != id).collect())
                    .await
            } else {
                Err(FlowError::not_found("approved asset", &id))
            }
        }
        PolicyCommands::Check { text } => {
            let policy = ContentPolicy::new(&inbox.links().await, &inbox.media().await);
            policy.check(&text)?;
            println!("ok");
            Ok(())
        }
    }
}

fn require_url(url: String) -> Result<String, FlowError> {
    let trimmed = url.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(FlowError::InvalidInput(format!(
            "'{url}' is not an http(s) URL"
        )))
    }
}
