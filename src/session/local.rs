//! Offline session backed by a fixed directory.
//!
//! Nothing leaves the process: `say` records the message, and inbound
//! messages are pushed with [`LocalSession::inject`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{EventSender, InboundMessage, MessageContext, Session, SessionEvent};
use crate::directory::{Contact, ContactQuery, Directory, DirectoryStore, Recipient, Room, RoomQuery};
use crate::error::{Error, Result};

pub struct LocalSession {
    id: String,
    account: String,
    store: DirectoryStore,
    sent: Mutex<Vec<(Recipient, String)>>,
    events: Mutex<Option<EventSender>>,
}

impl LocalSession {
    pub fn new(
        id: impl Into<String>,
        account: impl Into<String>,
        contacts: Vec<Contact>,
        rooms: Vec<Room>,
    ) -> Self {
        Self {
            id: id.into(),
            account: account.into(),
            store: DirectoryStore::new(contacts, rooms),
            sent: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        }
    }

    /// Everything passed to `say` so far.
    pub fn sent(&self) -> Vec<(Recipient, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Deliver an inbound message as if it came from the network.
    pub fn inject(&self, text: impl Into<String>, context: MessageContext) -> Result<()> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let tx = events
            .as_ref()
            .ok_or_else(|| Error::Session(format!("session {} is not started", self.id)))?;
        tx.send(SessionEvent::MessageReceived(InboundMessage {
            text: text.into(),
            context,
        }))
        .map_err(|_| Error::Session(format!("session {} is no longer observed", self.id)))
    }
}

#[async_trait]
impl Directory for LocalSession {
    async fn find_contact(&self, query: &ContactQuery) -> Result<Option<Contact>> {
        Ok(self.store.contact(query))
    }

    async fn find_contacts(&self, query: Option<&ContactQuery>) -> Result<Vec<Contact>> {
        Ok(self.store.contacts(query))
    }

    async fn find_room(&self, query: &RoomQuery) -> Result<Option<Room>> {
        Ok(self.store.room(query))
    }

    async fn find_rooms(&self, query: Option<&RoomQuery>) -> Result<Vec<Room>> {
        Ok(self.store.rooms(query))
    }

    async fn say(&self, to: &Recipient, content: &str) -> Result<()> {
        tracing::info!("[{}] say to {}: {}", self.id, to, content);
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((to.clone(), content.to_string()));
        Ok(())
    }
}

#[async_trait]
impl Session for LocalSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn directory(self: Arc<Self>) -> Arc<dyn Directory> {
        self
    }

    async fn start(self: Arc<Self>, events: EventSender) -> Result<()> {
        let _ = events.send(SessionEvent::Started);
        let _ = events.send(SessionEvent::LoggedIn {
            account: self.account.clone(),
        });
        *self.events.lock().unwrap_or_else(|e| e.into_inner()) = Some(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_start_emits_lifecycle_then_messages() {
        let session = Arc::new(LocalSession::new("alpha", "alpha_bot", Vec::new(), Vec::new()));
        let ctx = MessageContext {
            is_from_self: false,
            room: None,
            listener: None,
            sender: Contact::new("1", "Adam"),
        };
        assert!(session.inject("early", ctx.clone()).is_err());

        let (tx, mut rx) = mpsc::unbounded_channel();
        session.clone().start(tx).await.unwrap();
        session.inject("ding", ctx).unwrap();

        assert!(matches!(rx.recv().await, Some(SessionEvent::Started)));
        assert!(matches!(rx.recv().await, Some(SessionEvent::LoggedIn { account }) if account == "alpha_bot"));
        assert!(matches!(rx.recv().await, Some(SessionEvent::MessageReceived(m)) if m.text == "ding"));
    }
}
