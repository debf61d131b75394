//! Messaging sessions and their lifecycle.

pub mod local;
pub mod orchestrator;
pub mod resolver;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::directory::{Contact, Directory, Room};
use crate::error::Result;

pub use local::LocalSession;
pub use orchestrator::Orchestrator;
pub use resolver::resolve_reply_target;

/// Who sent an inbound message, and where.
#[derive(Debug, Clone)]
pub struct MessageContext {
    /// Sent by the account this session is logged in as.
    pub is_from_self: bool,
    /// Set for group conversations.
    pub room: Option<Room>,
    /// The human correspondent of a direct conversation.
    pub listener: Option<Contact>,
    pub sender: Contact,
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub text: String,
    pub context: MessageContext,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started,
    LoggedIn { account: String },
    ScanRequested { payload: String, status: String },
    MessageReceived(InboundMessage),
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// A running connection to a messaging network.
#[async_trait]
pub trait Session: Directory {
    fn id(&self) -> &str;

    /// Lookups and `say` for this session.
    fn directory(self: Arc<Self>) -> Arc<dyn Directory>;

    /// Start the session. Lifecycle and message events are reported on
    /// `events` for as long as the session runs.
    async fn start(self: Arc<Self>, events: EventSender) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Created,
    Started,
    LoggedIn,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::LoggedIn => "logged in",
        };
        f.write_str(name)
    }
}

/// The orchestrator's view of one session.
pub struct SessionHandle {
    pub id: String,
    pub role: Role,
    state: Mutex<LifecycleState>,
    session: Arc<dyn Session>,
}

impl SessionHandle {
    pub fn new(session: Arc<dyn Session>, role: Role) -> Self {
        Self {
            id: session.id().to_string(),
            role,
            state: Mutex::new(LifecycleState::Created),
            session,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move forward to `next`. Events never move a session backwards.
    pub fn advance(&self, next: LifecycleState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if next > *state {
            tracing::debug!("Session {} is now {}", self.id, next);
            *state = next;
        }
    }

    pub fn session(&self) -> Arc<dyn Session> {
        self.session.clone()
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }
}
