//! Cloud session tracking.
//!
//! A cloud client opens a session and keeps it alive by sending heartbeats.
//! A session whose deadline has passed is expired and cannot be revived.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cloud session kept alive by heartbeats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    deadline: DateTime<Utc>,
    heartbeat_interval: Duration,
}

impl Session {
    /// Create a session with a random ID.
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self::with_id(SessionId::new(), heartbeat_interval)
    }

    /// Create a session with a specific ID. The deadline starts one interval from now.
    pub fn with_id(id: SessionId, heartbeat_interval: Duration) -> Self {
        let mut session = Self {
            id,
            deadline: Utc::now(),
            heartbeat_interval,
        };
        session.heartbeat();
        session
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Push the deadline to now plus the heartbeat interval.
    pub fn heartbeat(&mut self) {
        let interval = chrono::Duration::from_std(self.heartbeat_interval)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        self.deadline = Utc::now()
            .checked_add_signed(interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    /// Whether the deadline lies after `at`.
    pub fn active(&self, at: DateTime<Utc>) -> bool {
        self.deadline > at
    }
}

/// Session error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(SessionId),

    #[error("session expired: {0}")]
    Expired(SessionId),
}

/// Session storage.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_session(&self, id: &SessionId) -> Result<Session, SessionError>;
    async fn create_session(&self, session: Session) -> Result<(), SessionError>;
    async fn update_session(&self, session: Session) -> Result<(), SessionError>;
}

/// Process-lifetime session store guarded by a lock.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn get_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    async fn create_session(&self, session: Session) -> Result<(), SessionError> {
        self.sessions.write().insert(session.id.clone(), session);
        Ok(())
    }

    async fn update_session(&self, session: Session) -> Result<(), SessionError> {
        self.sessions.write().insert(session.id.clone(), session);
        Ok(())
    }
}

/// Starts sessions and applies heartbeats.
pub struct SessionService {
    repository: Arc<dyn SessionRepository>,
    heartbeat_interval: Duration,
}

impl SessionService {
    pub fn new(repository: Arc<dyn SessionRepository>, heartbeat_interval: Duration) -> Self {
        Self {
            repository,
            heartbeat_interval,
        }
    }

    /// Open a new session.
    pub async fn start_session(&self) -> Result<Session, SessionError> {
        let session = Session::new(self.heartbeat_interval);
        self.repository.create_session(session.clone()).await?;
        tracing::info!(session_id = %session.id(), "cloud session started");
        Ok(session)
    }

    /// Extend a live session. Expired sessions are rejected.
    pub async fn heartbeat_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut session = self.repository.get_session(id).await?;
        if !session.active(Utc::now()) {
            tracing::warn!(session_id = %id, "heartbeat on expired session");
            return Err(SessionError::Expired(id.clone()));
        }

        session.heartbeat();
        self.repository.update_session(session).await
    }
}
