// SPDX-FileCopyrightText: 2026 MessengerFlow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session gate: who is logged in, and what they may see.
//!
//! The roster of agents and the single session pointer are mirrored to the
//! store on every change, so [`SessionGate::restore`] brings back the same
//! logged-in agent after a restart. Sessions never expire.

use std::sync::Arc;

use chrono::Utc;
use mflow_core::access::can_view_page;
use mflow_core::record::{load_all, remove, save};
use mflow_core::{Agent, FlowError, Page, Presence, Role, SessionPointer, StoreAdapter};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::password::{hash_secret, verify_secret};

/// Input for [`SessionGate::add_agent`].
#[derive(Clone)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
    pub secret: String,
    pub role: Role,
    pub avatar: String,
}

impl std::fmt::Debug for NewAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAgent")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("secret", &"[redacted]")
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Default)]
struct Roster {
    agents: Vec<Agent>,
    current: Option<String>,
}

impl Roster {
    fn by_email(&self, email: &str) -> Option<usize> {
        let wanted = email.trim().to_lowercase();
        self.agents
            .iter()
            .position(|a| a.email.trim().to_lowercase() == wanted)
    }

    fn current(&self) -> Option<&Agent> {
        let id = self.current.as_deref()?;
        self.agents.iter().find(|a| a.id == id)
    }
}

/// Agent roster plus the durable pointer to the logged-in agent.
pub struct SessionGate {
    store: Arc<dyn StoreAdapter>,
    roster: RwLock<Roster>,
}

impl SessionGate {
    pub fn new(store: Arc<dyn StoreAdapter>) -> Self {
        Self {
            store,
            roster: RwLock::new(Roster::default()),
        }
    }

    /// Reload the roster and session pointer from the store.
    ///
    /// Returns the logged-in agent, if the pointer still names one.
    pub async fn restore(&self) -> Result<Option<Agent>, FlowError> {
        let agents = load_all::<Agent>(self.store.as_ref()).await?;
        let pointer = load_all::<SessionPointer>(self.store.as_ref())
            .await?
            .into_iter()
            .find(|p| p.id == SessionPointer::KEY);

        let current_id = pointer
            .map(|p| p.agent_id)
            .filter(|id| agents.iter().any(|a| &a.id == id));

        let mut roster = self.roster.write().await;
        roster.agents = agents;
        roster.current = current_id;
        let current = roster.current().cloned();
        debug!(
            agents = roster.agents.len(),
            logged_in = current.is_some(),
            "session restored"
        );
        Ok(current)
    }

    /// Log in with `email` (case-insensitive) and `secret`.
    ///
    /// Unknown email and wrong secret are both a plain `false`.
    pub async fn login(&self, email: &str, secret: &str) -> Result<bool, FlowError> {
        let mut roster = self.roster.write().await;
        let Some(idx) = roster.by_email(email) else {
            debug!("login rejected");
            return Ok(false);
        };
        if !verify_secret(secret, &roster.agents[idx].password_hash) {
            debug!("login rejected");
            return Ok(false);
        }

        let agent = &mut roster.agents[idx];
        agent.status = Presence::Online;
        let agent = agent.clone();
        save(self.store.as_ref(), &agent).await?;
        save(
            self.store.as_ref(),
            &SessionPointer {
                id: SessionPointer::KEY.to_string(),
                agent_id: agent.id.clone(),
                since: Utc::now(),
            },
        )
        .await?;
        roster.current = Some(agent.id.clone());
        info!(agent_id = %agent.id, "agent logged in");
        Ok(true)
    }

    /// Log out the current agent, if any.
    pub async fn logout(&self) -> Result<(), FlowError> {
        let mut roster = self.roster.write().await;
        let Some(id) = roster.current.take() else {
            return Ok(());
        };
        if let Some(agent) = roster.agents.iter_mut().find(|a| a.id == id) {
            agent.status = Presence::Offline;
            save(self.store.as_ref(), &*agent).await?;
        }
        remove::<SessionPointer>(self.store.as_ref(), SessionPointer::KEY).await?;
        info!(agent_id = %id, "agent logged out");
        Ok(())
    }

    /// Rewrite the secret of the agent registered under `email`.
    pub async fn reset_password(&self, email: &str, new_secret: &str) -> Result<bool, FlowError> {
        if new_secret.is_empty() {
            return Err(FlowError::InvalidInput("new password is empty".into()));
        }
        let mut roster = self.roster.write().await;
        let Some(idx) = roster.by_email(email) else {
            return Ok(false);
        };
        let agent = &mut roster.agents[idx];
        agent.password_hash = hash_secret(new_secret)?;
        save(self.store.as_ref(), &*agent).await?;
        info!(agent_id = %agent.id, "password reset");
        Ok(true)
    }

    pub async fn current_agent(&self) -> Option<Agent> {
        self.roster.read().await.current().cloned()
    }

    pub async fn agents(&self) -> Vec<Agent> {
        self.roster.read().await.agents.clone()
    }

    /// Register a new agent. Emails are unique, case-insensitively.
    pub async fn add_agent(&self, new: NewAgent) -> Result<Agent, FlowError> {
        if new.email.trim().is_empty() || new.secret.is_empty() {
            return Err(FlowError::InvalidInput(
                "agent email and password are required".into(),
            ));
        }
        let mut roster = self.roster.write().await;
        if roster.by_email(&new.email).is_some() {
            return Err(FlowError::InvalidInput(format!(
                "an agent with email {} already exists",
                new.email.trim()
            )));
        }

        let agent = Agent {
            id: format!("agent-{}", Uuid::new_v4()),
            name: new.name,
            email: new.email.trim().to_string(),
            password_hash: hash_secret(&new.secret)?,
            avatar: new.avatar,
            role: new.role,
            status: Presence::Offline,
            assigned_page_ids: Vec::new(),
        };
        save(self.store.as_ref(), &agent).await?;
        roster.agents.push(agent.clone());
        info!(agent_id = %agent.id, role = %agent.role, "agent added");
        Ok(agent)
    }

    /// Remove an agent. Removing the logged-in agent ends the session.
    pub async fn remove_agent(&self, agent_id: &str) -> Result<(), FlowError> {
        let mut roster = self.roster.write().await;
        let before = roster.agents.len();
        roster.agents.retain(|a| a.id != agent_id);
        if roster.agents.len() == before {
            return Err(FlowError::not_found("agent", agent_id));
        }
        remove::<Agent>(self.store.as_ref(), agent_id).await?;
        if roster.current.as_deref() == Some(agent_id) {
            roster.current = None;
            remove::<SessionPointer>(self.store.as_ref(), SessionPointer::KEY).await?;
        }
        info!(agent_id, "agent removed");
        Ok(())
    }

    /// Record on the agent that it works on `page_id`, or no longer does.
    ///
    /// The page keeps its own list of agents; callers update both.
    pub async fn set_page_assignment(
        &self,
        agent_id: &str,
        page_id: &str,
        assigned: bool,
    ) -> Result<Agent, FlowError> {
        let mut roster = self.roster.write().await;
        let agent = roster
            .agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| FlowError::not_found("agent", agent_id))?;
        let present = agent.assigned_page_ids.iter().any(|id| id == page_id);
        if assigned && !present {
            agent.assigned_page_ids.push(page_id.to_string());
        } else if !assigned && present {
            agent.assigned_page_ids.retain(|id| id != page_id);
        } else {
            return Ok(agent.clone());
        }
        save(self.store.as_ref(), &*agent).await?;
        debug!(agent_id, page_id, assigned, "page assignment recorded on agent");
        Ok(agent.clone())
    }

    /// Set the presence of the logged-in agent.
    pub async fn set_presence(&self, presence: Presence) -> Result<(), FlowError> {
        let mut roster = self.roster.write().await;
        let id = roster
            .current
            .clone()
            .ok_or_else(|| FlowError::InvalidInput("no agent is logged in".into()))?;
        let agent = roster
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| FlowError::not_found("agent", &id))?;
        agent.status = presence;
        save(self.store.as_ref(), &*agent).await
    }

    /// Pages the logged-in agent may see; none when nobody is logged in.
    pub async fn visible_pages(&self, pages: &[Page]) -> Vec<Page> {
        let roster = self.roster.read().await;
        let Some(viewer) = roster.current() else {
            return Vec::new();
        };
        pages
            .iter()
            .filter(|p| can_view_page(viewer, p))
            .cloned()
            .collect()
    }

    pub async fn can_view(&self, page: &Page) -> bool {
        self.roster
            .read()
            .await
            .current()
            .is_some_and(|viewer| can_view_page(viewer, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mflow_storage::MemoryStore;

    fn new_agent(email: &str, role: Role) -> NewAgent {
        NewAgent {
            name: "Test".into(),
            email: email.into(),
            secret: "s3cret".into(),
            role,
            avatar: String::new(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let gate = SessionGate::new(Arc::new(MemoryStore::new()));
        gate.add_agent(new_agent("Ana@Shop.example", Role::Agent)).await.unwrap();
        let err = gate
            .add_agent(new_agent("ana@shop.example ", Role::Agent))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn presence_needs_a_session() {
        let gate = SessionGate::new(Arc::new(MemoryStore::new()));
        assert!(gate.set_presence(Presence::Busy).await.is_err());
        assert!(gate.current_agent().await.is_none());
    }

    #[tokio::test]
    async fn page_assignment_is_kept_on_the_agent() {
        let store: Arc<dyn StoreAdapter> = Arc::new(MemoryStore::new());
        let gate = SessionGate::new(store.clone());
        let agent = gate.add_agent(new_agent("a@b.c", Role::Agent)).await.unwrap();

        gate.set_page_assignment(&agent.id, "p1", true).await.unwrap();
        let updated = gate.set_page_assignment(&agent.id, "p1", true).await.unwrap();
        assert_eq!(updated.assigned_page_ids, vec!["p1".to_string()]);

        let reloaded = SessionGate::new(store);
        reloaded.restore().await.unwrap();
        assert_eq!(reloaded.agents().await[0].assigned_page_ids, vec!["p1".to_string()]);

        let cleared = gate.set_page_assignment(&agent.id, "p1", false).await.unwrap();
        assert!(cleared.assigned_page_ids.is_empty());
        assert!(matches!(
            gate.set_page_assignment("agent-missing", "p1", true).await,
            Err(FlowError::NotFound { .. })
        ));
    }

    #[test]
    fn new_agent_debug_hides_secret() {
        let out = format!("{:?}", new_agent("a@b.c", Role::Agent));
        assert!(!out.contains("s3cret"));
    }
}
