// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mflow agent` subcommands.

use std::io::{BufRead, Write};

use mflow_auth::NewAgent;
use mflow_core::FlowError;

use crate::{AgentCommands, Services};

pub async fn run(services: &Services, action: AgentCommands) -> Result<(), FlowError> {
    let gate = services.gate().await?;
    let inbox = services.inbox.as_ref();

    match action {
        AgentCommands::List => {
            let current = gate.current_agent().await.map(|a| a.id);
            for agent in gate.agents().await {
                let marker = if current.as_deref() == Some(agent.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{marker} {:<44} {:<28} {:<12} {}",
                    agent.id, agent.email, agent.role, agent.status
                );
            }
            Ok(())
        }
        AgentCommands::Add {
            name,
            email,
            role,
            password,
        } => {
            let secret = secret_or_prompt(password, "Password: ")?;
            let agent = gate
                .add_agent(NewAgent {
                    name,
                    email,
                    secret,
                    role,
                    avatar: String::new(),
                })
                .await?;
            println!("added {}", agent.id);
            Ok(())
        }
        AgentCommands::Remove { id } => {
            gate.remove_agent(&id).await?;
            println!("removed {id}");
            Ok(())
        }
        AgentCommands::Assign { agent_id, page_id } => {
            ensure_agent(&gate, &agent_id).await?;
            inbox.assign_agent_to_page(&page_id, &agent_id).await?;
            gate.set_page_assignment(&agent_id, &page_id, true).await?;
            println!("{agent_id} can now see {page_id}");
            Ok(())
        }
        AgentCommands::Unassign { agent_id, page_id } => {
            ensure_agent(&gate, &agent_id).await?;
            inbox.unassign_agent_from_page(&page_id, &agent_id).await?;
            gate.set_page_assignment(&agent_id, &page_id, false).await?;
            println!("{agent_id} can no longer see {page_id}");
            Ok(())
        }
        AgentCommands::Login { email, password } => {
            let secret = secret_or_prompt(password, "Password: ")?;
            if gate.login(&email, &secret).await? {
                println!("logged in as {email}");
                Ok(())
            } else {
                Err(FlowError::InvalidInput("invalid email or password".into()))
            }
        }
        AgentCommands::Logout => {
            gate.logout().await?;
            println!("logged out");
            Ok(())
        }
        AgentCommands::ResetPassword { email, password } => {
            let secret = secret_or_prompt(password, "New password: ")?;
            if gate.reset_password(&email, &secret).await? {
                println!("password updated for {email}");
                Ok(())
            } else {
                Err(FlowError::not_found("agent", &email))
            }
        }
    }
}

async fn ensure_agent(gate: &mflow_auth::SessionGate, agent_id: &str) -> Result<(), FlowError> {
    if gate.agents().await.iter().any(|a| a.id == agent_id) {
        Ok(())
    } else {
        Err(FlowError::not_found("agent", agent_id))
    }
}

/// Use the flag value, or read one line from stdin.
fn secret_or_prompt(flag: Option<String>, prompt: &str) -> Result<String, FlowError> {
    if let Some(secret) = flag {
        return Ok(secret);
    }
    eprint!("{prompt}");
    std::io::stderr()
        .flush()
        .map_err(|e| FlowError::Internal(format!("failed to write prompt: {e}")))?;
    read_secret(std::io::stdin().lock())
}

fn read_secret(mut input: impl BufRead) -> Result<String, FlowError> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| FlowError::Internal(format!("failed to read password: {e}")))?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        return Err(FlowError::InvalidInput("password is empty".into()));
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_is_read_without_line_ending() {
        let secret = read_secret("hunter2 \r\n".as_bytes()).unwrap();
        assert_eq!(secret, "hunter2 ");
        assert!(read_secret("\n".as_bytes()).is_err());
    }

    #[test]
    fn flag_wins_over_prompt() {
        assert_eq!(secret_or_prompt(Some("s3cret".into()), "unused").unwrap(), "s3cret");
    }

    #[tokio::test]
    async fn assign_and_unassign_update_page_and_agent() {
        let mut config = mflow_config::MflowConfig::default();
        config.storage.database_path = ":memory:".into();
        let services = Services::open(&config).await.unwrap();
        services
            .inbox
            .add_page(mflow_core::Page {
                id: "p1".into(),
                name: "Shop".into(),
                category: "Business".into(),
                is_connected: true,
                access_token: None,
                assigned_agent_ids: Vec::new(),
            })
            .await
            .unwrap();

        let add = AgentCommands::Add {
            name: "Ana".into(),
            email: "ana@shop.example".into(),
            role: mflow_core::Role::Agent,
            password: Some("hunter2".into()),
        };
        run(&services, add).await.unwrap();
        let agent_id = services.gate().await.unwrap().agents().await[0].id.clone();

        let assign = AgentCommands::Assign {
            agent_id: agent_id.clone(),
            page_id: "p1".into(),
        };
        run(&services, assign).await.unwrap();
        let agent = services.gate().await.unwrap().agents().await[0].clone();
        assert_eq!(agent.assigned_page_ids, vec!["p1".to_string()]);
        assert_eq!(services.inbox.pages().await[0].assigned_agent_ids, vec![agent_id.clone()]);

        let unassign = AgentCommands::Unassign {
            agent_id: agent_id.clone(),
            page_id: "p1".into(),
        };
        run(&services, unassign).await.unwrap();
        let agent = services.gate().await.unwrap().agents().await[0].clone();
        assert!(agent.assigned_page_ids.is_empty());
        assert!(services.inbox.pages().await[0].assigned_agent_ids.is_empty());
    }
}
